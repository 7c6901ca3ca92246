//! Collection policies: which dependencies are kept ([`DependencyFilter`]),
//! how dependency management rewrites them ([`DependencyManager`]) and which
//! nodes are expanded further ([`DependencyTraverser`]).
//!
//! Policies are immutable. The collector asks each one for a child instance
//! per node, so narrowing such as accumulated exclusions flows down the tree
//! without shared mutable state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use quarry_core::artifact::props;
use quarry_core::dependency::{scope, Dependency, Exclusion};

/// The node a child policy is derived for.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// Depth of the node, 0 for the root.
    pub depth: usize,
    /// The node's dependency, `None` for a root without one.
    pub dependency: Option<&'a Dependency>,
    /// Management declared by the node's descriptor (or the request, at the root).
    pub managed_dependencies: &'a [Dependency],
}

pub trait DependencyFilter: Send + Sync + fmt::Debug {
    fn accept(&self, dependency: &Dependency) -> bool;

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyFilter>;
}

pub trait DependencyManager: Send + Sync + fmt::Debug {
    /// Overrides for a dependency about to be resolved, `None` when unmanaged.
    fn manage(&self, dependency: &Dependency) -> Option<DependencyManagement>;

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyManager>;
}

pub trait DependencyTraverser: Send + Sync + fmt::Debug {
    /// Whether the dependencies of `dependency` are collected.
    fn traverse(&self, dependency: &Dependency) -> bool;

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyTraverser>;
}

/// What dependency management changes about one dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManagement {
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,
    pub exclusions: Option<Vec<Exclusion>>,
}

impl DependencyManagement {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ── Filters ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl DependencyFilter for AcceptAllFilter {
    fn accept(&self, _dependency: &Dependency) -> bool {
        true
    }

    fn derive_child(&self, _context: &PolicyContext<'_>) -> Arc<dyn DependencyFilter> {
        Arc::new(*self)
    }
}

/// Drops transitive dependencies by scope. Direct dependencies are always kept.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    included: Vec<String>,
    excluded: Vec<String>,
    transitive: bool,
}

impl ScopeFilter {
    /// Exclude the given scopes from transitive dependencies.
    pub fn excluding<S: Into<String>>(scopes: impl IntoIterator<Item = S>) -> Self {
        Self {
            included: Vec::new(),
            excluded: scopes.into_iter().map(Into::into).collect(),
            transitive: false,
        }
    }

    /// Keep only the given scopes among transitive dependencies.
    pub fn including<S: Into<String>>(scopes: impl IntoIterator<Item = S>) -> Self {
        Self {
            included: scopes.into_iter().map(Into::into).collect(),
            excluded: Vec::new(),
            transitive: false,
        }
    }
}

impl Default for ScopeFilter {
    fn default() -> Self {
        Self::excluding([scope::TEST, scope::PROVIDED])
    }
}

impl DependencyFilter for ScopeFilter {
    fn accept(&self, dependency: &Dependency) -> bool {
        if !self.transitive {
            return true;
        }
        let scope = dependency.scope.as_str();
        (self.included.is_empty() || self.included.iter().any(|s| s == scope))
            && !self.excluded.iter().any(|s| s == scope)
    }

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyFilter> {
        Arc::new(Self {
            transitive: self.transitive || context.depth >= 1,
            ..self.clone()
        })
    }
}

/// Drops optional dependencies of dependencies.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalFilter {
    transitive: bool,
}

impl DependencyFilter for OptionalFilter {
    fn accept(&self, dependency: &Dependency) -> bool {
        !self.transitive || !dependency.is_optional()
    }

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyFilter> {
        Arc::new(Self {
            transitive: self.transitive || context.depth >= 1,
        })
    }
}

/// Drops dependencies matched by any exclusion declared on the path from the root.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    exclusions: Vec<Exclusion>,
}

impl ExclusionFilter {
    pub fn new(exclusions: Vec<Exclusion>) -> Self {
        Self { exclusions }
    }
}

impl DependencyFilter for ExclusionFilter {
    fn accept(&self, dependency: &Dependency) -> bool {
        !self
            .exclusions
            .iter()
            .any(|e| e.matches(&dependency.artifact))
    }

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyFilter> {
        let added = context
            .dependency
            .map(|d| d.exclusions.as_slice())
            .unwrap_or_default();
        let mut exclusions = self.exclusions.clone();
        for exclusion in added {
            if !exclusions.contains(exclusion) {
                exclusions.push(exclusion.clone());
            }
        }
        Arc::new(Self { exclusions })
    }
}

/// Accepts a dependency only if every member filter does.
#[derive(Debug, Clone)]
pub struct AndFilter {
    filters: Vec<Arc<dyn DependencyFilter>>,
}

impl AndFilter {
    pub fn new(filters: Vec<Arc<dyn DependencyFilter>>) -> Self {
        Self { filters }
    }
}

impl DependencyFilter for AndFilter {
    fn accept(&self, dependency: &Dependency) -> bool {
        self.filters.iter().all(|f| f.accept(dependency))
    }

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyFilter> {
        Arc::new(Self {
            filters: self
                .filters
                .iter()
                .map(|f| f.derive_child(context))
                .collect(),
        })
    }
}

/// Scope, optional and exclusion filtering combined.
pub fn default_filter() -> Arc<dyn DependencyFilter> {
    Arc::new(AndFilter::new(vec![
        Arc::new(ScopeFilter::default()),
        Arc::new(OptionalFilter::default()),
        Arc::new(ExclusionFilter::default()),
    ]))
}

// ── Managers ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopManager;

impl DependencyManager for NoopManager {
    fn manage(&self, _dependency: &Dependency) -> Option<DependencyManagement> {
        None
    }

    fn derive_child(&self, _context: &PolicyContext<'_>) -> Arc<dyn DependencyManager> {
        Arc::new(*self)
    }
}

/// Managed values keyed by [`Dependency::management_key`]. The first entry
/// recorded for a key wins.
#[derive(Debug, Clone, Default)]
struct ManagedEntries {
    versions: HashMap<String, String>,
    scopes: HashMap<String, String>,
    optionals: HashMap<String, bool>,
    exclusions: HashMap<String, Vec<Exclusion>>,
}

impl ManagedEntries {
    fn absorb(&mut self, managed: &[Dependency]) {
        for dependency in managed {
            let key = dependency.management_key();
            if !dependency.artifact.version.is_empty() {
                self.versions
                    .entry(key.clone())
                    .or_insert_with(|| dependency.artifact.version.clone());
            }
            if !dependency.scope.is_empty() {
                self.scopes
                    .entry(key.clone())
                    .or_insert_with(|| dependency.scope.clone());
            }
            if let Some(optional) = dependency.optional {
                self.optionals.entry(key.clone()).or_insert(optional);
            }
            if !dependency.exclusions.is_empty() {
                let merged = self.exclusions.entry(key).or_default();
                for exclusion in &dependency.exclusions {
                    if !merged.contains(exclusion) {
                        merged.push(exclusion.clone());
                    }
                }
            }
        }
    }

    /// Versions, scopes and optionality are only managed below the direct
    /// dependencies; exclusions apply at every depth.
    fn manage(&self, dependency: &Dependency, depth: usize) -> Option<DependencyManagement> {
        let key = dependency.management_key();
        let mut management = DependencyManagement::default();
        if depth >= 2 {
            management.version = self.versions.get(&key).cloned();
            management.scope = self.scopes.get(&key).cloned();
            management.optional = self.optionals.get(&key).copied();
        }
        if let Some(managed) = self.exclusions.get(&key) {
            let mut exclusions = dependency.exclusions.clone();
            for exclusion in managed {
                if !exclusions.contains(exclusion) {
                    exclusions.push(exclusion.clone());
                }
            }
            management.exclusions = Some(exclusions);
        }
        (!management.is_empty()).then_some(management)
    }
}

/// Only management declared at the root (request and root descriptor) applies.
#[derive(Debug, Clone, Default)]
pub struct ClassicManager {
    depth: usize,
    entries: ManagedEntries,
}

impl DependencyManager for ClassicManager {
    fn manage(&self, dependency: &Dependency) -> Option<DependencyManagement> {
        self.entries.manage(dependency, self.depth)
    }

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyManager> {
        let mut entries = self.entries.clone();
        if self.depth == 0 {
            entries.absorb(context.managed_dependencies);
        }
        Arc::new(Self {
            depth: self.depth + 1,
            entries,
        })
    }
}

/// Management accumulates down the tree; entries declared closer to the root
/// dominate those found deeper.
#[derive(Debug, Clone, Default)]
pub struct TransitiveManager {
    depth: usize,
    entries: ManagedEntries,
}

impl DependencyManager for TransitiveManager {
    fn manage(&self, dependency: &Dependency) -> Option<DependencyManagement> {
        self.entries.manage(dependency, self.depth)
    }

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyManager> {
        let mut entries = self.entries.clone();
        entries.absorb(context.managed_dependencies);
        Arc::new(Self {
            depth: self.depth + 1,
            entries,
        })
    }
}

// ── Traversers ──────────────────────────────────────────────────────

/// Always or never expands nodes.
#[derive(Debug, Clone, Copy)]
pub struct StaticTraverser(pub bool);

impl DependencyTraverser for StaticTraverser {
    fn traverse(&self, _dependency: &Dependency) -> bool {
        self.0
    }

    fn derive_child(&self, _context: &PolicyContext<'_>) -> Arc<dyn DependencyTraverser> {
        Arc::new(*self)
    }
}

/// Does not expand artifacts that bundle their dependencies (war, ear, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct FatArtifactTraverser;

impl DependencyTraverser for FatArtifactTraverser {
    fn traverse(&self, dependency: &Dependency) -> bool {
        dependency.artifact.property(props::INCLUDES_DEPENDENCIES) != Some("true")
    }

    fn derive_child(&self, _context: &PolicyContext<'_>) -> Arc<dyn DependencyTraverser> {
        Arc::new(*self)
    }
}

/// Expands nodes down to `max_depth`; `1` collects direct dependencies only.
#[derive(Debug, Clone, Copy)]
pub struct DepthLimitedTraverser {
    max_depth: usize,
    depth: usize,
}

impl DepthLimitedTraverser {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            depth: 0,
        }
    }
}

impl DependencyTraverser for DepthLimitedTraverser {
    fn traverse(&self, _dependency: &Dependency) -> bool {
        self.depth < self.max_depth
    }

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyTraverser> {
        Arc::new(Self {
            depth: context.depth + 1,
            ..*self
        })
    }
}

#[derive(Debug, Clone)]
pub struct AndTraverser {
    traversers: Vec<Arc<dyn DependencyTraverser>>,
}

impl AndTraverser {
    pub fn new(traversers: Vec<Arc<dyn DependencyTraverser>>) -> Self {
        Self { traversers }
    }
}

impl DependencyTraverser for AndTraverser {
    fn traverse(&self, dependency: &Dependency) -> bool {
        self.traversers.iter().all(|t| t.traverse(dependency))
    }

    fn derive_child(&self, context: &PolicyContext<'_>) -> Arc<dyn DependencyTraverser> {
        Arc::new(Self {
            traversers: self
                .traversers
                .iter()
                .map(|t| t.derive_child(context))
                .collect(),
        })
    }
}
