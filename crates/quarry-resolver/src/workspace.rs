//! Artifacts provided by the build itself (e.g. sibling modules), consulted
//! before the local and remote repositories.

use std::collections::BTreeMap;
use std::path::PathBuf;

use quarry_core::artifact::Artifact;
use quarry_core::repository::WorkspaceRepository;

pub trait WorkspaceReader: Send + Sync {
    fn repository(&self) -> &WorkspaceRepository;

    /// The file of an artifact the workspace builds, if any.
    fn find_artifact(&self, artifact: &Artifact) -> Option<PathBuf>;

    /// Every version of `group:artifact` the workspace can provide.
    fn find_versions(&self, artifact: &Artifact) -> Vec<String>;
}

/// A workspace backed by an explicit list of artifacts.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspaceReader {
    repository: WorkspaceRepository,
    artifacts: BTreeMap<String, (Artifact, PathBuf)>,
}

impl StaticWorkspaceReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, artifact: Artifact, file: impl Into<PathBuf>) -> Self {
        self.artifacts
            .insert(artifact.key(), (artifact, file.into()));
        self
    }
}

impl WorkspaceReader for StaticWorkspaceReader {
    fn repository(&self) -> &WorkspaceRepository {
        &self.repository
    }

    fn find_artifact(&self, artifact: &Artifact) -> Option<PathBuf> {
        self.artifacts
            .get(&artifact.key())
            .map(|(_, file)| file.clone())
    }

    fn find_versions(&self, artifact: &Artifact) -> Vec<String> {
        let mut versions: Vec<String> = self
            .artifacts
            .values()
            .filter(|(a, _)| {
                a.group_id == artifact.group_id
                    && a.artifact_id == artifact.artifact_id
                    && a.classifier == artifact.classifier
                    && a.extension == artifact.extension
            })
            .map(|(a, _)| a.version.clone())
            .collect();
        versions.dedup();
        versions
    }
}
