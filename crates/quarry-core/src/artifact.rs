//! Artifact coordinates.
//!
//! An [`Artifact`] is a `group:artifact:extension:classifier:version` tuple plus
//! an optional local file and free-form properties. Values are never mutated in
//! place: every `with_*` method returns an updated copy.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// The literal qualifier that marks a moving development version.
pub const SNAPSHOT: &str = "SNAPSHOT";

/// Meta version resolving to the newest release.
pub const RELEASE: &str = "RELEASE";

/// Meta version resolving to the newest release or snapshot.
pub const LATEST: &str = "LATEST";

/// Well-known artifact property keys.
pub mod props {
    /// The packaging type the artifact was declared with (`jar`, `test-jar`, `pom`...).
    pub const TYPE: &str = "type";
    pub const LANGUAGE: &str = "language";
    /// `"true"` when the artifact bundles its own dependencies.
    pub const INCLUDES_DEPENDENCIES: &str = "includesDependencies";
    pub const CONSTITUTES_BUILD_PATH: &str = "constitutesBuildPath";
    /// File path for `system` scoped dependencies.
    pub const LOCAL_PATH: &str = "localPath";
}

static SNAPSHOT_TIMESTAMP: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(.*-)?([0-9]{8}\.[0-9]{6}-[0-9]+)$").ok());

/// A resolvable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    pub extension: String,
    pub classifier: String,
    pub version: String,
    pub file: Option<PathBuf>,
    pub properties: BTreeMap<String, String>,
}

impl Artifact {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        classifier: impl Into<String>,
        extension: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: extension.into(),
            classifier: classifier.into(),
            version: version.into(),
            file: None,
            properties: BTreeMap::new(),
        }
    }

    /// Parse `group:artifact[:extension[:classifier]]:version`.
    ///
    /// The extension defaults to `jar` when omitted.
    pub fn parse(coords: &str) -> Option<Self> {
        let parts: Vec<&str> = coords.split(':').collect();
        let artifact = match parts.as_slice() {
            [g, a, v] => Self::new(*g, *a, "", "jar", *v),
            [g, a, e, v] => Self::new(*g, *a, "", *e, *v),
            [g, a, e, c, v] => Self::new(*g, *a, *c, *e, *v),
            _ => return None,
        };
        if artifact.group_id.is_empty() || artifact.artifact_id.is_empty() || artifact.version.is_empty()
        {
            return None;
        }
        Some(artifact)
    }

    /// Whether the version denotes a snapshot, either literal or timestamped.
    pub fn is_snapshot(&self) -> bool {
        is_snapshot(&self.version)
    }

    /// The version with any snapshot timestamp collapsed back to `SNAPSHOT`.
    pub fn base_version(&self) -> String {
        base_version(&self.version)
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    pub fn with_file(&self, file: Option<PathBuf>) -> Self {
        Self {
            file,
            ..self.clone()
        }
    }

    pub fn with_properties(&self, properties: BTreeMap<String, String>) -> Self {
        Self {
            properties,
            ..self.clone()
        }
    }

    pub fn with_property(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut properties = self.properties.clone();
        properties.insert(key.into(), value.into());
        self.with_properties(properties)
    }

    /// Same artifact with different group/artifact/version, used for relocation targets.
    pub fn relocated(&self, group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
            file: None,
            ..self.clone()
        }
    }

    /// The descriptor (POM) companion of this artifact.
    pub fn pom(&self) -> Self {
        let mut pom = derive_artifact(self, "", "pom");
        pom.properties.clear();
        pom
    }

    /// `group:artifact:extension[:classifier]` without the version.
    pub fn versionless_id(&self) -> String {
        if self.classifier.is_empty() {
            format!("{}:{}:{}", self.group_id, self.artifact_id, self.extension)
        } else {
            format!(
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.extension, self.classifier
            )
        }
    }

    /// `group:artifact` identifier.
    pub fn ga(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Coordinate key identifying the artifact independently of file and properties.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if !self.extension.is_empty() {
            write!(f, ":{}", self.extension)?;
        }
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

/// Whether a version string is a literal or timestamped snapshot.
pub fn is_snapshot(version: &str) -> bool {
    version.ends_with(SNAPSHOT)
        || SNAPSHOT_TIMESTAMP
            .as_ref()
            .is_some_and(|re| re.is_match(version))
}

/// Collapse a timestamped snapshot (`1.0-20100419.164221-46`) to `1.0-SNAPSHOT`.
///
/// Versions without a timestamp are returned unchanged.
pub fn base_version(version: &str) -> String {
    match SNAPSHOT_TIMESTAMP.as_ref().and_then(|re| re.captures(version)) {
        Some(caps) => match caps.get(1) {
            Some(prefix) => format!("{}{SNAPSHOT}", prefix.as_str()),
            None => SNAPSHOT.to_string(),
        },
        None => version.to_string(),
    }
}

/// Build an artifact that follows `main` (a "sub-artifact").
///
/// Every `*` in `classifier` or `extension` expands to the main artifact's
/// value, so `derive_artifact(jar, "*-sources", "*")` of `lib-1.0-tests.jar`
/// yields `lib-1.0-tests-sources.jar`. Version and properties track `main`;
/// the file does not.
pub fn derive_artifact(main: &Artifact, classifier: &str, extension: &str) -> Artifact {
    Artifact {
        group_id: main.group_id.clone(),
        artifact_id: main.artifact_id.clone(),
        extension: expand(extension, &main.extension),
        classifier: expand(classifier, &main.classifier),
        version: main.version.clone(),
        file: None,
        properties: main.properties.clone(),
    }
}

fn expand(pattern: &str, replacement: &str) -> String {
    if pattern.contains('*') {
        pattern.replace('*', replacement)
    } else {
        pattern.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_three_parts_defaults_to_jar() {
        let a = Artifact::parse("org.example:lib:1.0").unwrap();
        assert_eq!(a.extension, "jar");
        assert_eq!(a.classifier, "");
        assert_eq!(a.version, "1.0");
    }

    #[test]
    fn parse_five_parts() {
        let a = Artifact::parse("org.example:lib:jar:sources:1.0").unwrap();
        assert_eq!(a.classifier, "sources");
        assert_eq!(a.to_string(), "org.example:lib:jar:sources:1.0");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Artifact::parse("org.example:lib").is_none());
        assert!(Artifact::parse("a:b:c:d:e:f").is_none());
        assert!(Artifact::parse("").is_none());
    }

    #[test]
    fn timestamped_snapshot_base_version() {
        assert_eq!(base_version("1.0-20100419.164221-46"), "1.0-SNAPSHOT");
        assert_eq!(base_version("20100419.164221-46"), "SNAPSHOT");
        assert_eq!(base_version("1.0"), "1.0");
        assert_eq!(base_version("1.0-SNAPSHOT"), "1.0-SNAPSHOT");
        assert!(!is_snapshot("1.0-20100419"));
    }

    #[test]
    fn snapshot_detection() {
        assert!(is_snapshot("1.0-SNAPSHOT"));
        assert!(is_snapshot("1.0-20100419.164221-46"));
        assert!(!is_snapshot("1.0"));
    }

    #[test]
    fn with_methods_do_not_mutate() {
        let a = Artifact::parse("g:a:1.0").unwrap();
        let b = a.with_version("2.0");
        assert_eq!(a.version, "1.0");
        assert_eq!(b.version, "2.0");
    }

    #[test]
    fn derived_artifact_expands_wildcards() {
        let main = Artifact::new("g", "a", "tests", "jar", "1.0");
        let sub = derive_artifact(&main, "*-sources", "*");
        assert_eq!(sub.classifier, "tests-sources");
        assert_eq!(sub.extension, "jar");
        assert_eq!(sub.version, "1.0");
    }

    #[test]
    fn pom_companion_has_no_classifier() {
        let main = Artifact::new("g", "a", "tests", "jar", "1.0");
        let pom = main.pom();
        assert_eq!(pom.to_string(), "g:a:pom:1.0");
    }
}
