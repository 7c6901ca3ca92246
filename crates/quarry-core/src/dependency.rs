use std::fmt;

use crate::artifact::Artifact;

/// Maven-compatible dependency scopes.
pub mod scope {
    pub const COMPILE: &str = "compile";
    pub const RUNTIME: &str = "runtime";
    pub const PROVIDED: &str = "provided";
    pub const TEST: &str = "test";
    pub const SYSTEM: &str = "system";
    pub const IMPORT: &str = "import";
}

/// A transitive dependency to exclude. Any field may be the wildcard `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
    pub classifier: String,
    pub extension: String,
}

impl Exclusion {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        classifier: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: classifier.into(),
            extension: extension.into(),
        }
    }

    /// Exclude every classifier and extension of `group:artifact`.
    pub fn of(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self::new(group_id, artifact_id, "*", "*")
    }

    /// Parse `group:artifact[:extension[:classifier]]`; omitted fields become `*`.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [g, a] => Some(Self::new(*g, *a, "*", "*")),
            [g, a, e] => Some(Self::new(*g, *a, "*", *e)),
            [g, a, e, c] => Some(Self::new(*g, *a, *c, *e)),
            _ => None,
        }
    }

    pub fn matches(&self, artifact: &Artifact) -> bool {
        field_matches(&self.group_id, &artifact.group_id)
            && field_matches(&self.artifact_id, &artifact.artifact_id)
            && field_matches(&self.extension, &artifact.extension)
            && field_matches(&self.classifier, &artifact.classifier)
    }
}

fn field_matches(pattern: &str, value: &str) -> bool {
    pattern == "*" || pattern == value
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.group_id, self.artifact_id, self.extension, self.classifier
        )
    }
}

/// A dependency edge: the target artifact plus how it is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub artifact: Artifact,
    pub scope: String,
    /// `None` when the declaration did not say.
    pub optional: Option<bool>,
    pub exclusions: Vec<Exclusion>,
}

impl Dependency {
    pub fn new(artifact: Artifact, scope: impl Into<String>) -> Self {
        Self {
            artifact,
            scope: scope.into(),
            optional: None,
            exclusions: Vec::new(),
        }
    }

    pub fn is_optional(&self) -> bool {
        self.optional.unwrap_or(false)
    }

    pub fn with_artifact(&self, artifact: Artifact) -> Self {
        Self {
            artifact,
            ..self.clone()
        }
    }

    pub fn with_scope(&self, scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..self.clone()
        }
    }

    pub fn with_optional(&self, optional: Option<bool>) -> Self {
        Self {
            optional,
            ..self.clone()
        }
    }

    pub fn with_exclusions(&self, exclusions: Vec<Exclusion>) -> Self {
        Self {
            exclusions,
            ..self.clone()
        }
    }

    /// Key under which dependency management and list merging deduplicate:
    /// `group:artifact:extension:classifier`.
    pub fn management_key(&self) -> String {
        let a = &self.artifact;
        format!(
            "{}:{}:{}:{}",
            a.group_id, a.artifact_id, a.extension, a.classifier
        )
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}", self.artifact, self.scope)?;
        if self.is_optional() {
            write!(f, "?")?;
        }
        write!(f, ")")
    }
}

/// Merge two dependency lists, keeping every dominant entry and adding
/// recessive entries whose [`Dependency::management_key`] is not already present.
pub fn merge_dependencies(dominant: &[Dependency], recessive: &[Dependency]) -> Vec<Dependency> {
    if dominant.is_empty() {
        return recessive.to_vec();
    }
    if recessive.is_empty() {
        return dominant.to_vec();
    }
    let mut merged = dominant.to_vec();
    let keys: std::collections::HashSet<String> =
        dominant.iter().map(Dependency::management_key).collect();
    merged.extend(
        recessive
            .iter()
            .filter(|d| !keys.contains(&d.management_key()))
            .cloned(),
    );
    merged
}
