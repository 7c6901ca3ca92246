//! Resolution of repository metadata (`maven-metadata.xml`) to local files.
//!
//! Each request names one repository, or none for the local repository's own
//! copy. Remote copies are refreshed according to the repository's update
//! policy; failures are recorded so that the next check can replay them.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use quarry_core::metadata::{Metadata, Nature};
use quarry_core::repository::{ChecksumPolicy, RemoteRepository, UpdatePolicy};
use quarry_maven::connector::{MetadataDownload, RepositoryConnectorProvider};
use quarry_maven::transfer::TransferError;
use quarry_maven::update::{UpdateCheck, UpdateCheckManager, UpdateItem, UpdatePolicyAnalyzer};

use crate::error::ResolverError;
use crate::session::ResolutionSession;
use crate::tasks::run_bounded;

#[derive(Debug, Clone)]
pub struct MetadataRequest {
    pub metadata: Metadata,
    /// `None` for the copy installed in the local repository.
    pub repository: Option<RemoteRepository>,
}

impl MetadataRequest {
    pub fn local(metadata: Metadata) -> Self {
        Self {
            metadata,
            repository: None,
        }
    }

    pub fn remote(metadata: Metadata, repository: RemoteRepository) -> Self {
        Self {
            metadata,
            repository: Some(repository),
        }
    }
}

#[derive(Debug)]
pub struct MetadataResult {
    pub request: MetadataRequest,
    /// The local copy, when there is one.
    pub file: Option<PathBuf>,
    pub error: Option<ResolverError>,
}

#[async_trait]
pub trait MetadataResolver: Send + Sync {
    /// Resolve every request. Results are returned in request order; failures
    /// are reported per result.
    async fn resolve_metadata(
        &self,
        session: &ResolutionSession,
        requests: Vec<MetadataRequest>,
    ) -> Vec<MetadataResult>;
}

pub struct DefaultMetadataResolver {
    connectors: Arc<dyn RepositoryConnectorProvider>,
}

impl DefaultMetadataResolver {
    pub fn new(connectors: Arc<dyn RepositoryConnectorProvider>) -> Self {
        Self { connectors }
    }
}

/// What to do with one request before any transfer happens.
enum Plan {
    Done {
        file: Option<PathBuf>,
        error: Option<ResolverError>,
    },
    Fetch {
        check: UpdateCheck,
        checksum_policy: ChecksumPolicy,
    },
}

#[async_trait]
impl MetadataResolver for DefaultMetadataResolver {
    async fn resolve_metadata(
        &self,
        session: &ResolutionSession,
        requests: Vec<MetadataRequest>,
    ) -> Vec<MetadataResult> {
        let mut results = Vec::with_capacity(requests.len());
        let mut slots = Vec::new();
        let mut jobs = Vec::new();

        for request in requests {
            match plan(session, &request) {
                Plan::Done { file, error } => results.push(MetadataResult {
                    request,
                    file,
                    error,
                }),
                Plan::Fetch {
                    check,
                    checksum_policy,
                } => {
                    slots.push(results.len());
                    jobs.push(fetch(
                        self.connectors.clone(),
                        session.update_check_manager.clone(),
                        request.metadata.clone(),
                        check,
                        checksum_policy,
                    ));
                    results.push(MetadataResult {
                        request,
                        file: None,
                        error: None,
                    });
                }
            }
        }

        let outcomes = run_bounded(session.max_concurrent_downloads, jobs).await;
        for (slot, outcome) in slots.into_iter().zip(outcomes) {
            let result = &mut results[slot];
            match outcome {
                Some(Ok(file)) => result.file = Some(file),
                Some(Err(e)) => result.error = Some(e),
                None => {
                    result.error = Some(
                        TransferError::Interrupted {
                            item: result.request.metadata.to_string(),
                        }
                        .into(),
                    )
                }
            }
        }
        results
    }
}

fn plan(session: &ResolutionSession, request: &MetadataRequest) -> Plan {
    let lrm = &session.local_repository_manager;
    let Some(repository) = &request.repository else {
        let file = lrm.path_for_local_metadata(&request.metadata);
        return Plan::Done {
            file: file.is_file().then_some(file),
            error: None,
        };
    };

    let Some((update_policy, checksum_policy)) =
        metadata_policy(session, repository, request.metadata.nature)
    else {
        debug!(metadata = %request.metadata, repository = %repository.id, "skipping disabled repository");
        return Plan::Done {
            file: None,
            error: None,
        };
    };

    let file = lrm.path_for_remote_metadata(&request.metadata, repository);
    if session.offline {
        if file.is_file() {
            return Plan::Done {
                file: Some(file),
                error: None,
            };
        }
        return Plan::Done {
            file: None,
            error: Some(
                TransferError::Offline {
                    item: request.metadata.to_string(),
                    repository: repository.id.clone(),
                }
                .into(),
            ),
        };
    }

    let check = UpdateCheck {
        item: UpdateItem::Metadata(request.metadata.clone()),
        file: file.clone(),
        repository: repository.clone(),
        policy: update_policy,
        local_last_updated: 0,
    };
    let outcome = session.update_check_manager.check(&check);
    if outcome.required {
        return Plan::Fetch {
            check,
            checksum_policy,
        };
    }
    match outcome.error {
        Some(error) => Plan::Done {
            file: None,
            error: Some(error.into()),
        },
        None => Plan::Done {
            file: file.is_file().then_some(file),
            error: None,
        },
    }
}

/// Update and checksum policy for metadata of the given nature, or `None`
/// when the repository serves no such versions.
///
/// Metadata covering both releases and snapshots uses the stricter of the
/// enabled policies.
pub(crate) fn metadata_policy(
    session: &ResolutionSession,
    repository: &RemoteRepository,
    nature: Nature,
) -> Option<(UpdatePolicy, ChecksumPolicy)> {
    let releases = repository.release_policy.enabled;
    let snapshots = repository.snapshot_policy.enabled;
    match nature {
        Nature::Release if releases => Some(session.repository_policy(repository, false)),
        Nature::Snapshot if snapshots => Some(session.repository_policy(repository, true)),
        Nature::ReleaseOrSnapshot if releases && snapshots => {
            let (ru, rc) = session.repository_policy(repository, false);
            let (su, sc) = session.repository_policy(repository, true);
            Some((UpdatePolicyAnalyzer::effective_policy(ru, su), rc.stricter(sc)))
        }
        Nature::ReleaseOrSnapshot if releases => Some(session.repository_policy(repository, false)),
        Nature::ReleaseOrSnapshot if snapshots => Some(session.repository_policy(repository, true)),
        _ => None,
    }
}

async fn fetch(
    connectors: Arc<dyn RepositoryConnectorProvider>,
    updates: UpdateCheckManager,
    metadata: Metadata,
    check: UpdateCheck,
    checksum_policy: ChecksumPolicy,
) -> Result<PathBuf, ResolverError> {
    let connector = connectors.connector(&check.repository)?;
    let mut downloads = [MetadataDownload::new(metadata, check.file.clone(), checksum_policy)];
    connector.get(&mut [], &mut downloads).await;

    let [download] = downloads;
    updates.touch(&check, download.error.as_ref());
    match download.error {
        None => Ok(check.file),
        Some(error) => {
            if error.is_not_found() && check.file.exists() {
                if let Err(e) = std::fs::remove_file(&check.file) {
                    warn!("Failed to delete stale {}: {e}", check.file.display());
                }
            }
            Err(error.into())
        }
    }
}
