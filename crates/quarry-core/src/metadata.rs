//! Repository metadata coordinates.

use std::fmt;

/// File name of versioning metadata in the Maven 2 layout.
pub const MAVEN_METADATA_XML: &str = "maven-metadata.xml";

/// Which kinds of versions a piece of metadata describes. Repositories whose
/// policy for every relevant kind is disabled are never asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nature {
    Release,
    Snapshot,
    ReleaseOrSnapshot,
}

/// Identifies a metadata file: `group[/artifact[/version]]/<type>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Metadata {
    pub group_id: String,
    pub artifact_id: String,
    /// Empty for artifact-level metadata.
    pub version: String,
    pub type_: String,
    pub nature: Nature,
}

impl Metadata {
    /// Artifact-level `maven-metadata.xml` listing every published version.
    pub fn versions(group_id: &str, artifact_id: &str, nature: Nature) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: String::new(),
            type_: MAVEN_METADATA_XML.to_string(),
            nature,
        }
    }

    /// Version-level `maven-metadata.xml` describing the builds of one snapshot.
    pub fn snapshot(group_id: &str, artifact_id: &str, base_version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: base_version.to_string(),
            type_: MAVEN_METADATA_XML.to_string(),
            nature: Nature::Snapshot,
        }
    }

    /// Whether a repository policy pair allows fetching this metadata.
    pub fn allowed_by(&self, releases_enabled: bool, snapshots_enabled: bool) -> bool {
        match self.nature {
            Nature::Release => releases_enabled,
            Nature::Snapshot => snapshots_enabled,
            Nature::ReleaseOrSnapshot => releases_enabled || snapshots_enabled,
        }
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.group_id)?;
        if !self.artifact_id.is_empty() {
            write!(f, ":{}", self.artifact_id)?;
        }
        if !self.version.is_empty() {
            write!(f, ":{}", self.version)?;
        }
        write!(f, "/{}", self.type_)
    }
}
