//! Recursive collection of the dependency tree.
//!
//! Starting from a root dependency (or a plain list of dependencies) the
//! collector filters and manages each declared dependency, expands its
//! version range, reads the descriptor of every matching version and recurses
//! into the dependencies it declares. Failures below the root are collected
//! and the affected branch skipped; siblings carry on.

use std::fmt;
use std::sync::Arc;

use async_recursion::async_recursion;
use async_trait::async_trait;
use tracing::{debug, trace};

use quarry_core::artifact::Artifact;
use quarry_core::dependency::{merge_dependencies, Dependency};
use quarry_core::repository::RemoteRepository;

use crate::descriptor::{ArtifactDescriptorReader, ArtifactDescriptorRequest};
use crate::error::ResolverError;
use crate::graph::{DependencyGraph, DependencyNode, NodeId};
use crate::policy::{DependencyFilter, DependencyManager, DependencyTraverser, PolicyContext};
use crate::range_resolver::{VersionRangeRequest, VersionRangeResolver, VersionRangeResult};
use crate::remote::RemoteRepositoryManager;
use crate::session::ResolutionSession;

#[derive(Debug, Clone, Default)]
pub struct CollectRequest {
    /// Root whose descriptor supplies further dependencies.
    pub root: Option<Dependency>,
    /// Names a dependency-less root; its descriptor is not read.
    pub root_artifact: Option<Artifact>,
    /// Direct dependencies, dominating those of the root descriptor.
    pub dependencies: Vec<Dependency>,
    /// Management dominating that of every descriptor met.
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
}

impl CollectRequest {
    pub fn for_root(root: Dependency, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            root: Some(root),
            repositories,
            ..Self::default()
        }
    }

    pub fn for_dependencies(dependencies: Vec<Dependency>, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            dependencies,
            repositories,
            ..Self::default()
        }
    }

    pub fn with_managed_dependencies(mut self, managed: Vec<Dependency>) -> Self {
        self.managed_dependencies = managed;
        self
    }

    fn describe_root(&self) -> String {
        match (&self.root, &self.root_artifact) {
            (Some(root), _) => root.artifact.to_string(),
            (None, Some(artifact)) => artifact.to_string(),
            (None, None) => format!("{} dependencies", self.dependencies.len()),
        }
    }
}

/// A dependency that reappears among its own ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCycle {
    /// Versionless ids from the first occurrence down to the repeat.
    pub path: Vec<String>,
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join(" -> "))
    }
}

#[derive(Debug)]
pub struct CollectResult {
    /// The tree as far as it could be built.
    pub graph: DependencyGraph,
    /// Failures of individual dependencies below the root.
    pub errors: Vec<ResolverError>,
    pub cycles: Vec<DependencyCycle>,
    root: String,
}

impl CollectResult {
    /// The graph, or a [`ResolverError::DependencyCollection`] carrying it
    /// when anything failed.
    pub fn into_result(self) -> Result<DependencyGraph, ResolverError> {
        if self.errors.is_empty() {
            Ok(self.graph)
        } else {
            Err(ResolverError::DependencyCollection {
                root: self.root,
                graph: Box::new(self.graph),
                errors: self.errors,
            })
        }
    }
}

#[async_trait]
pub trait DependencyCollector: Send + Sync {
    /// Fails only when the root cannot be resolved or a relocation cycle is
    /// met; everything else is reported in [`CollectResult::errors`].
    async fn collect_dependencies(
        &self,
        session: &ResolutionSession,
        request: CollectRequest,
    ) -> Result<CollectResult, ResolverError>;
}

pub struct DefaultDependencyCollector {
    descriptors: Arc<dyn ArtifactDescriptorReader>,
    ranges: Arc<dyn VersionRangeResolver>,
}

impl DefaultDependencyCollector {
    pub fn new(
        descriptors: Arc<dyn ArtifactDescriptorReader>,
        ranges: Arc<dyn VersionRangeResolver>,
    ) -> Self {
        Self {
            descriptors,
            ranges,
        }
    }
}

/// Mutable state of one collection.
struct Collection {
    graph: DependencyGraph,
    errors: Vec<ResolverError>,
    cycles: Vec<DependencyCycle>,
}

/// The dependencies of one node and the policies in force for them.
struct Branch {
    parent: NodeId,
    dependencies: Vec<Dependency>,
    repositories: Vec<RemoteRepository>,
    filter: Arc<dyn DependencyFilter>,
    manager: Arc<dyn DependencyManager>,
    traverser: Arc<dyn DependencyTraverser>,
}

/// A dependency after management, with the values it replaced.
struct Managed {
    dependency: Dependency,
    premanaged_version: Option<String>,
    premanaged_scope: Option<String>,
}

#[async_trait]
impl DependencyCollector for DefaultDependencyCollector {
    async fn collect_dependencies(
        &self,
        session: &ResolutionSession,
        request: CollectRequest,
    ) -> Result<CollectResult, ResolverError> {
        let root_name = request.describe_root();
        let mut dependencies = request.dependencies.clone();
        let mut managed = request.managed_dependencies.clone();
        let mut repositories = request.repositories.clone();

        let root = match &request.root {
            Some(root) => {
                let range = self
                    .ranges
                    .resolve_version_range(
                        session,
                        &VersionRangeRequest::new(root.artifact.clone(), repositories.clone()),
                    )
                    .await?;
                let Some(version) = range.highest() else {
                    return Err(no_versions(&root.artifact, &range));
                };
                let artifact = root.artifact.with_version(version.as_str());
                let descriptor = self
                    .descriptors
                    .read_descriptor(
                        session,
                        &ArtifactDescriptorRequest::new(artifact, repositories.clone()),
                    )
                    .await?;

                dependencies = merge_dependencies(&dependencies, &descriptor.dependencies);
                managed = merge_dependencies(&managed, &descriptor.managed_dependencies);
                repositories = RemoteRepositoryManager::aggregate(
                    session,
                    &repositories,
                    &descriptor.repositories,
                    true,
                );
                let dependency = root.with_artifact(descriptor.artifact.clone());
                DependencyNode {
                    conflict_id: Some(dependency.management_key()),
                    dependency: Some(dependency),
                    relocations: descriptor.relocations,
                    requested_version: Some(root.artifact.version.clone()),
                    repositories: repositories.clone(),
                    repository: descriptor.repository,
                    ..DependencyNode::default()
                }
            }
            None => DependencyNode {
                repositories: repositories.clone(),
                ..DependencyNode::root(None, request.root_artifact.clone())
            },
        };

        let context = PolicyContext {
            depth: 0,
            dependency: root.dependency.as_ref(),
            managed_dependencies: &managed,
        };
        let filter = session.dependency_filter.derive_child(&context);
        let manager = session.dependency_manager.derive_child(&context);
        let traverser = session.dependency_traverser.derive_child(&context);

        let graph = DependencyGraph::new(root);
        let mut collection = Collection {
            graph,
            errors: Vec::new(),
            cycles: Vec::new(),
        };
        let branch = Branch {
            parent: collection.graph.root(),
            dependencies,
            repositories,
            filter,
            manager,
            traverser,
        };
        self.process(session, &mut collection, branch).await?;

        debug!(
            root = %root_name,
            nodes = collection.graph.len(),
            errors = collection.errors.len(),
            "collected dependencies"
        );
        Ok(CollectResult {
            graph: collection.graph,
            errors: collection.errors,
            cycles: collection.cycles,
            root: root_name,
        })
    }
}

impl DefaultDependencyCollector {
    #[async_recursion]
    async fn process(
        &self,
        session: &ResolutionSession,
        collection: &mut Collection,
        branch: Branch,
    ) -> Result<(), ResolverError> {
        for declared in &branch.dependencies {
            if !branch.filter.accept(declared) {
                trace!(dependency = %declared, "filtered out");
                continue;
            }
            let managed = manage(branch.manager.as_ref(), declared);
            if managed.dependency != *declared && !branch.filter.accept(&managed.dependency) {
                trace!(dependency = %managed.dependency, "filtered out after management");
                continue;
            }
            let dependency = &managed.dependency;

            let range = match self.version_range(session, dependency, &branch.repositories).await {
                Ok(range) => range,
                Err(e) => {
                    collection.errors.push(e);
                    continue;
                }
            };
            for error in &range.errors {
                debug!(dependency = %dependency, "repository problem during range resolution: {error}");
            }
            if range.versions.is_empty() {
                collection.errors.push(no_versions(&dependency.artifact, &range));
                continue;
            }

            for version in &range.versions {
                let artifact = dependency.artifact.with_version(version.as_str());
                let request = ArtifactDescriptorRequest::new(artifact, branch.repositories.clone());
                let descriptor = match self.descriptors.read_descriptor(session, &request).await {
                    Ok(descriptor) => descriptor,
                    Err(e @ ResolverError::RelocationCycle { .. }) => return Err(e),
                    Err(e) => {
                        collection.errors.push(e);
                        continue;
                    }
                };

                let candidate = dependency.with_artifact(descriptor.artifact.clone());
                if descriptor.is_relocated() && !branch.filter.accept(&candidate) {
                    trace!(dependency = %candidate, "relocated dependency filtered out");
                    continue;
                }

                let repositories = RemoteRepositoryManager::aggregate(
                    session,
                    &branch.repositories,
                    &descriptor.repositories,
                    true,
                );
                let cycle = self.find_cycle(&collection.graph, branch.parent, &candidate);
                let child = collection.graph.add_child(
                    branch.parent,
                    DependencyNode {
                        conflict_id: Some(candidate.management_key()),
                        dependency: Some(candidate.clone()),
                        relocations: descriptor.relocations.clone(),
                        requested_version: Some(dependency.artifact.version.clone()),
                        premanaged_version: managed.premanaged_version.clone(),
                        premanaged_scope: managed.premanaged_scope.clone(),
                        repositories: repositories.clone(),
                        repository: descriptor.repository.clone(),
                        ..DependencyNode::default()
                    },
                );

                if let Some(cycle) = cycle {
                    debug!("dependency cycle: {cycle}");
                    collection.cycles.push(cycle);
                    continue;
                }
                if descriptor.dependencies.is_empty() || !branch.traverser.traverse(&candidate) {
                    continue;
                }

                let context = PolicyContext {
                    depth: collection.graph.node(child).depth,
                    dependency: Some(&candidate),
                    managed_dependencies: &descriptor.managed_dependencies,
                };
                let next = Branch {
                    parent: child,
                    dependencies: descriptor.dependencies.clone(),
                    repositories,
                    filter: branch.filter.derive_child(&context),
                    manager: branch.manager.derive_child(&context),
                    traverser: branch.traverser.derive_child(&context),
                };
                self.process(session, collection, next).await?;
            }
        }
        Ok(())
    }

    /// Expand the version of `dependency`, reusing earlier expansions of the
    /// same coordinate from the session's data pool.
    async fn version_range(
        &self,
        session: &ResolutionSession,
        dependency: &Dependency,
        repositories: &[RemoteRepository],
    ) -> Result<Arc<VersionRangeResult>, ResolverError> {
        let artifact = &dependency.artifact;
        if let Some(cached) = session.data_pool.range(artifact, repositories) {
            return Ok(cached);
        }
        let request = VersionRangeRequest::new(artifact.clone(), repositories.to_vec());
        let range = Arc::new(self.ranges.resolve_version_range(session, &request).await?);
        session
            .data_pool
            .put_range(artifact, repositories, range.clone());
        Ok(range)
    }

    /// The cycle formed by adding `candidate` below `parent`, if an ancestor
    /// already carries the same artifact.
    fn find_cycle(
        &self,
        graph: &DependencyGraph,
        parent: NodeId,
        candidate: &Dependency,
    ) -> Option<DependencyCycle> {
        let id = candidate.artifact.versionless_id();
        let mut path: Vec<String> = graph
            .ancestors(parent)
            .into_iter()
            .filter_map(|node| graph.node(node).artifact().map(Artifact::versionless_id))
            .collect();
        path.reverse();
        let start = path.iter().position(|ancestor| *ancestor == id)?;
        let mut path = path.split_off(start);
        path.push(id);
        Some(DependencyCycle { path })
    }
}

/// Apply dependency management, remembering what it replaced.
fn manage(manager: &dyn DependencyManager, declared: &Dependency) -> Managed {
    let mut managed = Managed {
        dependency: declared.clone(),
        premanaged_version: None,
        premanaged_scope: None,
    };
    let Some(management) = manager.manage(declared) else {
        return managed;
    };

    if let Some(version) = management.version {
        if version != declared.artifact.version {
            managed.premanaged_version = Some(declared.artifact.version.clone());
            managed.dependency = managed
                .dependency
                .with_artifact(declared.artifact.with_version(version));
        }
    }
    if let Some(scope) = management.scope {
        if scope != declared.scope {
            managed.premanaged_scope = Some(declared.scope.clone());
            managed.dependency = managed.dependency.with_scope(scope);
        }
    }
    if let Some(optional) = management.optional {
        managed.dependency = managed.dependency.with_optional(Some(optional));
    }
    if let Some(exclusions) = management.exclusions {
        managed.dependency = managed.dependency.with_exclusions(exclusions);
    }
    managed
}

fn no_versions(artifact: &Artifact, range: &VersionRangeResult) -> ResolverError {
    ResolverError::VersionRangeResolution {
        artifact: artifact.to_string(),
        message: format!(
            "No versions available for {} within range {}",
            artifact.ga(),
            range.constraint
        ),
    }
}
