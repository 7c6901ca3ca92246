//! Resolution of artifacts to local files.
//!
//! Each artifact is looked up in order: its own file or `localPath`, the
//! workspace, the local repository, then every candidate repository in turn.
//! Downloads for one repository share a connector and run with bounded
//! parallelism; repositories are tried one after another so the first one
//! that has an artifact supplies it.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use quarry_core::artifact::{props, Artifact};
use quarry_core::repository::{ArtifactRepository, ChecksumPolicy, RemoteRepository};
use quarry_maven::connector::{ArtifactDownload, RepositoryConnector, RepositoryConnectorProvider};
use quarry_maven::local::{LocalArtifactRequest, LocalRepositoryManager};
use quarry_maven::transfer::TransferError;
use quarry_maven::update::{UpdateCheck, UpdateCheckManager, UpdateItem};
use quarry_util::errors::QuarryError;

use crate::error::ResolverError;
use crate::session::ResolutionSession;
use crate::tasks::run_bounded;
use crate::version_resolver::{VersionRequest, VersionResolver};

#[derive(Debug, Clone)]
pub struct ArtifactRequest {
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
}

impl ArtifactRequest {
    pub fn new(artifact: Artifact, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            artifact,
            repositories,
        }
    }
}

#[derive(Debug)]
pub struct ArtifactResult {
    pub request: ArtifactRequest,
    /// The resolved artifact, with its file set.
    pub artifact: Option<Artifact>,
    pub repository: Option<ArtifactRepository>,
    /// Every failure met on the way, including those of repositories tried
    /// before the one that succeeded.
    pub errors: Vec<ResolverError>,
}

impl ArtifactResult {
    fn new(request: ArtifactRequest) -> Self {
        Self {
            request,
            artifact: None,
            repository: None,
            errors: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.artifact.as_ref().and_then(Artifact::file).is_some()
    }

    fn resolved(&mut self, artifact: Artifact, file: PathBuf, repository: ArtifactRepository) {
        self.artifact = Some(artifact.with_file(Some(file)));
        self.repository = Some(repository);
    }
}

#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    /// Resolve every request. When any artifact stays unresolved the call
    /// fails with [`ResolverError::ArtifactResolution`], which still carries
    /// the results of the artifacts that did resolve.
    async fn resolve_artifacts(
        &self,
        session: &ResolutionSession,
        requests: Vec<ArtifactRequest>,
    ) -> Result<Vec<ArtifactResult>, ResolverError>;

    async fn resolve_artifact(
        &self,
        session: &ResolutionSession,
        request: ArtifactRequest,
    ) -> Result<ArtifactResult, ResolverError> {
        let mut results = self.resolve_artifacts(session, vec![request]).await?;
        match results.pop() {
            Some(result) => Ok(result),
            None => Err(QuarryError::Generic {
                message: "artifact resolution returned no result".to_string(),
            }
            .into()),
        }
    }
}

pub struct DefaultArtifactResolver {
    connectors: Arc<dyn RepositoryConnectorProvider>,
    versions: Arc<dyn VersionResolver>,
}

impl DefaultArtifactResolver {
    pub fn new(
        connectors: Arc<dyn RepositoryConnectorProvider>,
        versions: Arc<dyn VersionResolver>,
    ) -> Self {
        Self {
            connectors,
            versions,
        }
    }
}

/// An artifact that has to be downloaded.
struct Pending {
    slot: usize,
    artifact: Artifact,
    repositories: Vec<RemoteRepository>,
    /// A copy exists locally but is not available for these repositories.
    local_file: bool,
}

#[async_trait]
impl ArtifactResolver for DefaultArtifactResolver {
    async fn resolve_artifacts(
        &self,
        session: &ResolutionSession,
        requests: Vec<ArtifactRequest>,
    ) -> Result<Vec<ArtifactResult>, ResolverError> {
        let lrm = &session.local_repository_manager;
        let mut results: Vec<ArtifactResult> = Vec::with_capacity(requests.len());
        let mut pending = Vec::new();

        for request in requests {
            let slot = results.len();
            results.push(ArtifactResult::new(request));
            let result = &mut results[slot];
            let artifact = result.request.artifact.clone();

            if let Some(path) = artifact.property(props::LOCAL_PATH) {
                let path = PathBuf::from(path);
                if path.is_file() {
                    result.resolved(artifact.clone(), path, local_source(session));
                } else {
                    result.errors.push(ResolverError::ArtifactNotFound {
                        artifact: format!("{artifact} at {}", path.display()),
                        repositories: Vec::new(),
                    });
                }
                continue;
            }

            if let Some(file) = artifact.file() {
                let file = file.to_path_buf();
                if file.is_file() {
                    result.resolved(artifact.clone(), file, local_source(session));
                } else {
                    result.errors.push(ResolverError::ArtifactNotFound {
                        artifact: format!("{artifact} at {}", file.display()),
                        repositories: Vec::new(),
                    });
                }
                continue;
            }

            let mut repositories = result.request.repositories.clone();
            let version = self
                .versions
                .resolve_version(
                    session,
                    &VersionRequest::new(artifact.clone(), repositories.clone()),
                )
                .await;
            let artifact = match version {
                Ok(version) => {
                    if let Some(ArtifactRepository::Remote(source)) = &version.repository {
                        repositories.retain(|r| r.id == source.id);
                        if repositories.is_empty() {
                            repositories.push(source.clone());
                        }
                    }
                    result.errors.extend(version.errors);
                    artifact.with_version(version.version)
                }
                Err(e) => {
                    result.errors.push(e);
                    continue;
                }
            };

            if let Some(workspace) = &session.workspace_reader {
                if let Some(file) = workspace.find_artifact(&artifact) {
                    let source = ArtifactRepository::Workspace(workspace.repository().clone());
                    result.resolved(artifact, file, source);
                    continue;
                }
            }

            let local = lrm.find(&LocalArtifactRequest {
                artifact: artifact.clone(),
                repositories: repositories.clone(),
            });
            let local_file = local.file.is_some();
            if local.available {
                if let Some(file) = local.file {
                    let source = local.repository.unwrap_or_else(|| local_source(session));
                    result.resolved(artifact, file, source);
                    continue;
                }
            }

            if session.offline {
                if repositories.is_empty() {
                    result.errors.push(ResolverError::ArtifactNotFound {
                        artifact: artifact.to_string(),
                        repositories: Vec::new(),
                    });
                }
                for repository in &repositories {
                    result.errors.push(
                        TransferError::Offline {
                            item: artifact.to_string(),
                            repository: repository.id.clone(),
                        }
                        .into(),
                    );
                }
                continue;
            }

            pending.push(Pending {
                slot,
                artifact,
                repositories,
                local_file,
            });
        }

        self.download(session, &pending, &mut results).await;

        for item in &pending {
            let result = &mut results[item.slot];
            if !result.is_resolved() && result.errors.is_empty() {
                result.errors.push(ResolverError::ArtifactNotFound {
                    artifact: item.artifact.to_string(),
                    repositories: item.repositories.iter().map(|r| r.id.clone()).collect(),
                });
            }
        }

        if results.iter().all(ArtifactResult::is_resolved) {
            Ok(results)
        } else {
            Err(ResolverError::ArtifactResolution { results })
        }
    }
}

impl DefaultArtifactResolver {
    /// Try each repository in the order they first appear, downloading the
    /// artifacts still unresolved that list it.
    async fn download(
        &self,
        session: &ResolutionSession,
        pending: &[Pending],
        results: &mut [ArtifactResult],
    ) {
        let mut order: Vec<&RemoteRepository> = Vec::new();
        for item in pending {
            for repository in &item.repositories {
                if !order.contains(&repository) {
                    order.push(repository);
                }
            }
        }

        for repository in order {
            let group: Vec<&Pending> = pending
                .iter()
                .filter(|item| !results[item.slot].is_resolved())
                .filter(|item| item.repositories.contains(repository))
                .filter(|item| repository.policy(item.artifact.is_snapshot()).enabled)
                .collect();
            if group.is_empty() {
                continue;
            }

            let connector = match self.connectors.connector(repository) {
                Ok(connector) => connector,
                Err(e) => {
                    for item in &group {
                        results[item.slot].errors.push(e.clone().into());
                    }
                    continue;
                }
            };

            let mut slots = Vec::new();
            let mut jobs = Vec::new();
            for item in group {
                let snapshot = item.artifact.is_snapshot();
                let (update_policy, checksum_policy) = session.repository_policy(repository, snapshot);
                let file = session
                    .local_repository_manager
                    .path_for_remote_artifact(&item.artifact, repository);

                let check = if item.local_file {
                    None
                } else {
                    let check = UpdateCheck {
                        item: UpdateItem::Artifact(item.artifact.clone()),
                        file: file.clone(),
                        repository: repository.clone(),
                        policy: update_policy,
                        local_last_updated: 0,
                    };
                    let outcome = session.update_check_manager.check(&check);
                    if !outcome.required {
                        if let Some(error) = outcome.error {
                            results[item.slot].errors.push(error.into());
                        }
                        continue;
                    }
                    Some(check)
                };

                slots.push(item);
                jobs.push(fetch(Fetch {
                    connector: connector.clone(),
                    updates: session.update_check_manager.clone(),
                    lrm: session.local_repository_manager.clone(),
                    artifact: item.artifact.clone(),
                    repository: repository.clone(),
                    file,
                    checksum_policy,
                    check,
                }));
            }

            debug!(repository = %repository.id, artifacts = jobs.len(), "downloading artifacts");
            let outcomes = run_bounded(session.max_concurrent_downloads, jobs).await;
            for (item, outcome) in slots.into_iter().zip(outcomes) {
                let result = &mut results[item.slot];
                match outcome {
                    Some(Ok(file)) => result.resolved(
                        item.artifact.clone(),
                        file,
                        ArtifactRepository::Remote(repository.clone()),
                    ),
                    Some(Err(e)) => result.errors.push(e.into()),
                    None => result.errors.push(
                        TransferError::Interrupted {
                            item: item.artifact.to_string(),
                        }
                        .into(),
                    ),
                }
            }
        }
    }
}

fn local_source(session: &ResolutionSession) -> ArtifactRepository {
    ArtifactRepository::Local(session.local_repository_manager.repository().clone())
}

struct Fetch {
    connector: Arc<dyn RepositoryConnector>,
    updates: UpdateCheckManager,
    lrm: Arc<dyn LocalRepositoryManager>,
    artifact: Artifact,
    repository: RemoteRepository,
    file: PathBuf,
    checksum_policy: ChecksumPolicy,
    /// Absent when a local copy exists and only provenance is being refreshed.
    check: Option<UpdateCheck>,
}

async fn fetch(job: Fetch) -> Result<PathBuf, TransferError> {
    let mut downloads = [ArtifactDownload::new(
        job.artifact.clone(),
        job.file.clone(),
        job.checksum_policy,
    )];
    job.connector.get(&mut downloads, &mut []).await;
    let [download] = downloads;

    if let Some(check) = &job.check {
        job.updates.touch(check, download.error.as_ref());
    }
    match download.error {
        Some(error) => Err(error),
        None => {
            if let Err(e) = job.lrm.add_remote_artifact(&job.artifact, &job.repository) {
                warn!("Failed to record origin of {}: {e}", job.artifact);
            }
            Ok(job.file)
        }
    }
}
