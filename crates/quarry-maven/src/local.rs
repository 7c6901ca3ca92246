//! Local repository managers: where cached artifacts and metadata live, and
//! whether a cached artifact may be used for a given set of repositories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use quarry_core::artifact::Artifact;
use quarry_core::metadata::Metadata;
use quarry_core::repository::{ArtifactRepository, LocalRepository, RemoteRepository};

use crate::layout;
use crate::tracking::TrackingFileManager;

/// Name of the provenance file kept next to artifacts by the enhanced manager.
pub const REMOTE_REPOSITORIES_FILE: &str = "_remote.repositories";

/// Lookup of an artifact in the local repository.
#[derive(Debug, Clone)]
pub struct LocalArtifactRequest {
    pub artifact: Artifact,
    /// Repositories the caller would accept the artifact from.
    pub repositories: Vec<RemoteRepository>,
}

#[derive(Debug, Clone, Default)]
pub struct LocalArtifactResult {
    /// Set when the file exists, even if it is not `available`.
    pub file: Option<PathBuf>,
    /// Whether the file may be used for the requested repositories.
    pub available: bool,
    /// Where the file came from, when known.
    pub repository: Option<ArtifactRepository>,
}

pub trait LocalRepositoryManager: Send + Sync {
    fn repository(&self) -> &LocalRepository;

    /// Absolute path of a locally installed artifact.
    fn path_for_local_artifact(&self, artifact: &Artifact) -> PathBuf;

    /// Absolute path an artifact downloaded from `repository` is cached at.
    fn path_for_remote_artifact(&self, artifact: &Artifact, repository: &RemoteRepository)
        -> PathBuf;

    fn path_for_local_metadata(&self, metadata: &Metadata) -> PathBuf;

    fn path_for_remote_metadata(&self, metadata: &Metadata, repository: &RemoteRepository)
        -> PathBuf;

    fn find(&self, request: &LocalArtifactRequest) -> LocalArtifactResult;

    /// Record a locally installed artifact.
    fn add_local_artifact(&self, artifact: &Artifact) -> std::io::Result<()>;

    /// Record an artifact downloaded from `repository`.
    fn add_remote_artifact(
        &self,
        artifact: &Artifact,
        repository: &RemoteRepository,
    ) -> std::io::Result<()>;
}

/// Pick the manager for a local repository's layout: `simple` or, by default,
/// `enhanced`.
pub fn manager_for(repository: LocalRepository) -> Arc<dyn LocalRepositoryManager> {
    if repository.content_type == "simple" {
        Arc::new(SimpleLocalRepositoryManager::new(repository))
    } else {
        Arc::new(EnhancedLocalRepositoryManager::new(repository))
    }
}

/// Plain Maven 2 layout without provenance tracking: any cached file is
/// available for any repository.
#[derive(Debug, Clone)]
pub struct SimpleLocalRepositoryManager {
    repository: LocalRepository,
}

impl SimpleLocalRepositoryManager {
    pub fn new(repository: LocalRepository) -> Self {
        Self { repository }
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.repository.basedir().join(relative)
    }

    fn metadata_path(&self, metadata: &Metadata, repository_key: &str) -> PathBuf {
        let mut path = layout::metadata_path(metadata);
        if let Some(stem) = path.strip_suffix(".xml") {
            path = format!("{stem}-{repository_key}.xml");
        }
        self.resolve(&path)
    }
}

impl LocalRepositoryManager for SimpleLocalRepositoryManager {
    fn repository(&self) -> &LocalRepository {
        &self.repository
    }

    fn path_for_local_artifact(&self, artifact: &Artifact) -> PathBuf {
        self.resolve(&layout::artifact_path(artifact))
    }

    fn path_for_remote_artifact(
        &self,
        artifact: &Artifact,
        _repository: &RemoteRepository,
    ) -> PathBuf {
        self.resolve(&layout::artifact_path(artifact))
    }

    fn path_for_local_metadata(&self, metadata: &Metadata) -> PathBuf {
        self.metadata_path(metadata, "local")
    }

    fn path_for_remote_metadata(
        &self,
        metadata: &Metadata,
        repository: &RemoteRepository,
    ) -> PathBuf {
        self.metadata_path(metadata, &repository.id)
    }

    fn find(&self, request: &LocalArtifactRequest) -> LocalArtifactResult {
        let path = self.path_for_local_artifact(&request.artifact);
        if path.is_file() {
            LocalArtifactResult {
                file: Some(path),
                available: true,
                repository: None,
            }
        } else {
            LocalArtifactResult::default()
        }
    }

    fn add_local_artifact(&self, _artifact: &Artifact) -> std::io::Result<()> {
        Ok(())
    }

    fn add_remote_artifact(
        &self,
        _artifact: &Artifact,
        _repository: &RemoteRepository,
    ) -> std::io::Result<()> {
        Ok(())
    }
}

/// Maven 2 layout plus a `_remote.repositories` file per artifact directory
/// recording which repositories each file was obtained from.
///
/// A cached file is only available when it was installed locally or was
/// downloaded from one of the requested repositories. Files without any
/// record predate tracking and stay available.
#[derive(Debug, Clone)]
pub struct EnhancedLocalRepositoryManager {
    simple: SimpleLocalRepositoryManager,
    tracking: TrackingFileManager,
}

impl EnhancedLocalRepositoryManager {
    pub fn new(repository: LocalRepository) -> Self {
        Self {
            simple: SimpleLocalRepositoryManager::new(repository),
            tracking: TrackingFileManager::new(),
        }
    }

    fn tracking_file(artifact_file: &Path) -> PathBuf {
        artifact_file.with_file_name(REMOTE_REPOSITORIES_FILE)
    }

    fn key(artifact_file: &Path, repository_id: &str) -> String {
        let name = artifact_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{name}>{repository_id}")
    }

    fn record(&self, artifact_file: &Path, repository_id: &str) -> std::io::Result<()> {
        let mut updates = BTreeMap::new();
        updates.insert(Self::key(artifact_file, repository_id), Some(String::new()));
        self.tracking
            .update(&Self::tracking_file(artifact_file), &updates)
            .map(|_| ())
    }
}

impl LocalRepositoryManager for EnhancedLocalRepositoryManager {
    fn repository(&self) -> &LocalRepository {
        self.simple.repository()
    }

    fn path_for_local_artifact(&self, artifact: &Artifact) -> PathBuf {
        self.simple.path_for_local_artifact(artifact)
    }

    fn path_for_remote_artifact(
        &self,
        artifact: &Artifact,
        repository: &RemoteRepository,
    ) -> PathBuf {
        self.simple.path_for_remote_artifact(artifact, repository)
    }

    fn path_for_local_metadata(&self, metadata: &Metadata) -> PathBuf {
        self.simple.path_for_local_metadata(metadata)
    }

    fn path_for_remote_metadata(
        &self,
        metadata: &Metadata,
        repository: &RemoteRepository,
    ) -> PathBuf {
        self.simple.path_for_remote_metadata(metadata, repository)
    }

    fn find(&self, request: &LocalArtifactRequest) -> LocalArtifactResult {
        let path = self.path_for_local_artifact(&request.artifact);
        if !path.is_file() {
            return LocalArtifactResult::default();
        }
        let mut result = LocalArtifactResult {
            file: Some(path.clone()),
            available: false,
            repository: None,
        };

        let records = self
            .tracking
            .read(&Self::tracking_file(&path))
            .unwrap_or_default();
        let prefix = Self::key(&path, "");
        if !records.keys().any(|k| k.starts_with(&prefix)) {
            debug!("{} has no provenance record, treating as available", path.display());
            result.available = true;
            return result;
        }
        if records.contains_key(&prefix) {
            result.available = true;
            result.repository = Some(ArtifactRepository::Local(self.repository().clone()));
            return result;
        }
        if let Some(repo) = request
            .repositories
            .iter()
            .find(|r| records.contains_key(&Self::key(&path, &r.id)))
        {
            result.available = true;
            result.repository = Some(ArtifactRepository::Remote(repo.clone()));
        }
        result
    }

    fn add_local_artifact(&self, artifact: &Artifact) -> std::io::Result<()> {
        self.record(&self.path_for_local_artifact(artifact), "")
    }

    fn add_remote_artifact(
        &self,
        artifact: &Artifact,
        repository: &RemoteRepository,
    ) -> std::io::Result<()> {
        self.record(
            &self.path_for_remote_artifact(artifact, repository),
            &repository.id,
        )
    }
}
