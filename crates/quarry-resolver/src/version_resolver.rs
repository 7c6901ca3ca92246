//! Resolution of a declared version to one concrete version.
//!
//! Literal versions pass through untouched. `RELEASE`, `LATEST` and
//! `-SNAPSHOT` versions are looked up in repository metadata; when several
//! repositories answer, the one whose metadata was updated most recently
//! wins.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use quarry_core::artifact::{Artifact, LATEST, RELEASE, SNAPSHOT};
use quarry_core::metadata::{Metadata, Nature};
use quarry_core::repository::{ArtifactRepository, RemoteRepository};
use quarry_maven::metadata::{read_metadata, MavenMetadata};

use crate::error::ResolverError;
use crate::metadata_resolver::{MetadataRequest, MetadataResolver};
use crate::session::ResolutionSession;

#[derive(Debug, Clone)]
pub struct VersionRequest {
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
}

impl VersionRequest {
    pub fn new(artifact: Artifact, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            artifact,
            repositories,
        }
    }
}

#[derive(Debug)]
pub struct VersionResult {
    pub version: String,
    /// Where the version was found; `None` for a version passed through as is.
    pub repository: Option<ArtifactRepository>,
    /// Failures of individual repositories that did not prevent resolution.
    pub errors: Vec<ResolverError>,
}

#[async_trait]
pub trait VersionResolver: Send + Sync {
    async fn resolve_version(
        &self,
        session: &ResolutionSession,
        request: &VersionRequest,
    ) -> Result<VersionResult, ResolverError>;
}

pub struct DefaultVersionResolver {
    metadata: Arc<dyn MetadataResolver>,
}

impl DefaultVersionResolver {
    pub fn new(metadata: Arc<dyn MetadataResolver>) -> Self {
        Self { metadata }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaVersion {
    Release,
    Latest,
    Snapshot,
}

impl MetaVersion {
    fn of(version: &str) -> Option<Self> {
        if version == RELEASE {
            Some(MetaVersion::Release)
        } else if version == LATEST {
            Some(MetaVersion::Latest)
        } else if version.ends_with(SNAPSHOT) {
            Some(MetaVersion::Snapshot)
        } else {
            None
        }
    }
}

/// A value read from one repository's metadata.
#[derive(Debug, Clone)]
struct VersionInfo {
    version: String,
    last_updated: String,
    repository: ArtifactRepository,
}

/// Newest-wins merge of metadata values, keyed by `RELEASE`, `LATEST`,
/// `SNAPSHOT` or `SNAPSHOT<classifier>:<extension>`.
#[derive(Debug, Default)]
struct VersionInfos(HashMap<String, VersionInfo>);

impl VersionInfos {
    fn merge(&mut self, key: String, version: &str, last_updated: &str, repository: &ArtifactRepository) {
        if version.is_empty() {
            return;
        }
        let newer = self
            .0
            .get(&key)
            .map_or(true, |existing| last_updated > existing.last_updated.as_str());
        if newer {
            self.0.insert(
                key,
                VersionInfo {
                    version: version.to_string(),
                    last_updated: last_updated.to_string(),
                    repository: repository.clone(),
                },
            );
        }
    }

    fn absorb(&mut self, artifact: &Artifact, metadata: &MavenMetadata, repository: &ArtifactRepository) {
        let versioning = &metadata.versioning;
        let last_updated = metadata.last_updated();
        if let Some(release) = &versioning.release {
            self.merge(RELEASE.to_string(), release, last_updated, repository);
        }
        if let Some(latest) = &versioning.latest {
            self.merge(LATEST.to_string(), latest, last_updated, repository);
        }

        for entry in &versioning.snapshot_versions {
            let updated = if entry.updated.is_empty() {
                last_updated
            } else {
                entry.updated.as_str()
            };
            self.merge(format!("{SNAPSHOT}{}", entry.key()), &entry.value, updated, repository);
        }

        if let Some(snapshot) = &versioning.snapshot {
            if versioning.snapshot_versions.is_empty() {
                let version = if snapshot.local_copy {
                    artifact.version.clone()
                } else {
                    match snapshot.qualifier() {
                        Some(qualifier) => {
                            let base = artifact.version.strip_suffix(SNAPSHOT).unwrap_or(&artifact.version);
                            format!("{base}{qualifier}")
                        }
                        None => artifact.version.clone(),
                    }
                };
                self.merge(SNAPSHOT.to_string(), &version, last_updated, repository);
            }
        }
    }

    fn get(&self, key: &str) -> Option<&VersionInfo> {
        self.0.get(key)
    }
}

#[async_trait]
impl VersionResolver for DefaultVersionResolver {
    async fn resolve_version(
        &self,
        session: &ResolutionSession,
        request: &VersionRequest,
    ) -> Result<VersionResult, ResolverError> {
        let artifact = &request.artifact;
        let Some(kind) = MetaVersion::of(&artifact.version) else {
            return Ok(VersionResult {
                version: artifact.version.clone(),
                repository: None,
                errors: Vec::new(),
            });
        };

        if kind == MetaVersion::Snapshot {
            if let Some(workspace) = &session.workspace_reader {
                if workspace.find_versions(artifact).contains(&artifact.version) {
                    debug!(artifact = %artifact, "snapshot provided by the workspace");
                    return Ok(VersionResult {
                        version: artifact.version.clone(),
                        repository: Some(ArtifactRepository::Workspace(workspace.repository().clone())),
                        errors: Vec::new(),
                    });
                }
            }
        }

        let metadata = match kind {
            MetaVersion::Release => {
                Metadata::versions(&artifact.group_id, &artifact.artifact_id, Nature::Release)
            }
            MetaVersion::Latest => Metadata::versions(
                &artifact.group_id,
                &artifact.artifact_id,
                Nature::ReleaseOrSnapshot,
            ),
            MetaVersion::Snapshot => {
                Metadata::snapshot(&artifact.group_id, &artifact.artifact_id, &artifact.version)
            }
        };

        let mut requests = vec![MetadataRequest::local(metadata.clone())];
        requests.extend(
            request
                .repositories
                .iter()
                .map(|r| MetadataRequest::remote(metadata.clone(), r.clone())),
        );

        let local = ArtifactRepository::Local(session.local_repository_manager.repository().clone());
        let mut infos = VersionInfos::default();
        let mut errors = Vec::new();
        for result in self.metadata.resolve_metadata(session, requests).await {
            if let Some(error) = result.error {
                if !error.is_not_found() {
                    errors.push(error);
                }
            }
            let Some(file) = result.file else {
                continue;
            };
            match read_metadata(&file) {
                Ok(parsed) => {
                    let repository = match &result.request.repository {
                        Some(remote) => ArtifactRepository::Remote(remote.clone()),
                        None => local.clone(),
                    };
                    infos.absorb(artifact, &parsed, &repository);
                }
                Err(e) => {
                    warn!("Could not parse metadata {}: {e}", file.display());
                    errors.push(e.into());
                }
            }
        }

        let chosen = match kind {
            MetaVersion::Release => infos.get(RELEASE),
            MetaVersion::Latest => infos.get(LATEST).or_else(|| infos.get(RELEASE)),
            MetaVersion::Snapshot => infos
                .get(&format!("{SNAPSHOT}{}:{}", artifact.classifier, artifact.extension))
                .or_else(|| infos.get(SNAPSHOT)),
        };

        let mut result = match (kind, chosen) {
            (_, Some(info)) => VersionResult {
                version: info.version.clone(),
                repository: Some(info.repository.clone()),
                errors,
            },
            (MetaVersion::Snapshot, None) => VersionResult {
                version: artifact.version.clone(),
                repository: None,
                errors,
            },
            (_, None) => VersionResult {
                version: String::new(),
                repository: None,
                errors,
            },
        };

        if result.version.is_empty() {
            let mut message = format!("no {} version listed in repository metadata", artifact.version);
            for error in &result.errors {
                message.push_str(&format!("; {error}"));
            }
            return Err(ResolverError::VersionResolution {
                artifact: artifact.to_string(),
                message,
            });
        }

        // LATEST may point at a snapshot, which needs its own lookup in the
        // repository that listed it.
        if kind != MetaVersion::Snapshot && result.version.ends_with(SNAPSHOT) {
            let repositories = match result.repository.as_ref().and_then(ArtifactRepository::as_remote) {
                Some(remote) => vec![remote.clone()],
                None => Vec::new(),
            };
            let sub = VersionRequest::new(artifact.with_version(result.version.clone()), repositories);
            let mut snapshot = self.resolve_version(session, &sub).await?;
            if snapshot.repository.is_none() {
                snapshot.repository = result.repository.take();
            }
            let mut errors = result.errors;
            errors.append(&mut snapshot.errors);
            snapshot.errors = errors;
            return Ok(snapshot);
        }

        debug!(artifact = %artifact, version = %result.version, "resolved version");
        Ok(result)
    }
}
