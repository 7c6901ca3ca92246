//! Expansion of a version range into the matching published versions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use quarry_core::artifact::Artifact;
use quarry_core::metadata::{Metadata, Nature};
use quarry_core::repository::{ArtifactRepository, RemoteRepository};
use quarry_core::version::{Version, VersionConstraint};
use quarry_maven::metadata::read_metadata;

use crate::error::ResolverError;
use crate::metadata_resolver::{MetadataRequest, MetadataResolver};
use crate::session::ResolutionSession;
use crate::version_resolver::{VersionRequest, VersionResolver};

#[derive(Debug, Clone)]
pub struct VersionRangeRequest {
    /// The artifact whose version is a range or a plain version.
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
}

impl VersionRangeRequest {
    pub fn new(artifact: Artifact, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            artifact,
            repositories,
        }
    }
}

#[derive(Debug)]
pub struct VersionRangeResult {
    pub constraint: VersionConstraint,
    /// Matching versions, ascending. Empty when nothing matched.
    pub versions: Vec<Version>,
    /// Source of each version, keyed by the version string.
    pub repositories: HashMap<String, ArtifactRepository>,
    /// Failures of individual repositories that did not prevent resolution.
    pub errors: Vec<ResolverError>,
}

impl VersionRangeResult {
    pub fn repository(&self, version: &Version) -> Option<&ArtifactRepository> {
        self.repositories.get(version.as_str())
    }

    pub fn highest(&self) -> Option<&Version> {
        self.versions.last()
    }
}

#[async_trait]
pub trait VersionRangeResolver: Send + Sync {
    /// Fails only when the version specification cannot be parsed or a plain
    /// meta version cannot be expanded; a range matching nothing yields an
    /// empty result.
    async fn resolve_version_range(
        &self,
        session: &ResolutionSession,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, ResolverError>;
}

pub struct DefaultVersionRangeResolver {
    metadata: Arc<dyn MetadataResolver>,
    versions: Arc<dyn VersionResolver>,
}

impl DefaultVersionRangeResolver {
    pub fn new(metadata: Arc<dyn MetadataResolver>, versions: Arc<dyn VersionResolver>) -> Self {
        Self { metadata, versions }
    }
}

#[async_trait]
impl VersionRangeResolver for DefaultVersionRangeResolver {
    async fn resolve_version_range(
        &self,
        session: &ResolutionSession,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, ResolverError> {
        let artifact = &request.artifact;
        let constraint = VersionConstraint::parse(&artifact.version).map_err(|e| {
            ResolverError::VersionRangeResolution {
                artifact: artifact.to_string(),
                message: e.to_string(),
            }
        })?;

        if !constraint.is_range() {
            let resolved = self
                .versions
                .resolve_version(
                    session,
                    &VersionRequest::new(artifact.clone(), request.repositories.clone()),
                )
                .await
                .map_err(|e| ResolverError::VersionRangeResolution {
                    artifact: artifact.to_string(),
                    message: e.to_string(),
                })?;
            let version = Version::parse(&resolved.version);
            let mut repositories = HashMap::new();
            if let Some(repository) = resolved.repository {
                repositories.insert(version.as_str().to_string(), repository);
            }
            return Ok(VersionRangeResult {
                constraint,
                versions: vec![version],
                repositories,
                errors: resolved.errors,
            });
        }

        let mut repositories: HashMap<String, ArtifactRepository> = HashMap::new();
        let mut errors = Vec::new();

        if let Some(workspace) = &session.workspace_reader {
            let source = ArtifactRepository::Workspace(workspace.repository().clone());
            for version in workspace.find_versions(artifact) {
                repositories.entry(version).or_insert_with(|| source.clone());
            }
        }

        let metadata = Metadata::versions(
            &artifact.group_id,
            &artifact.artifact_id,
            Nature::ReleaseOrSnapshot,
        );
        let mut requests = vec![MetadataRequest::local(metadata.clone())];
        requests.extend(
            request
                .repositories
                .iter()
                .map(|r| MetadataRequest::remote(metadata.clone(), r.clone())),
        );

        let local = ArtifactRepository::Local(session.local_repository_manager.repository().clone());
        for result in self.metadata.resolve_metadata(session, requests).await {
            if let Some(error) = result.error {
                if !error.is_not_found() {
                    errors.push(error);
                }
            }
            let Some(file) = result.file else {
                continue;
            };
            let listed = match read_metadata(&file) {
                Ok(parsed) => parsed.versioning.versions,
                Err(e) => {
                    warn!("Could not parse metadata {}: {e}", file.display());
                    errors.push(e.into());
                    continue;
                }
            };
            let source = match &result.request.repository {
                Some(remote) => ArtifactRepository::Remote(remote.clone()),
                None => local.clone(),
            };
            for version in listed {
                repositories.entry(version).or_insert_with(|| source.clone());
            }
        }

        let mut versions: Vec<Version> = repositories
            .keys()
            .map(|v| Version::parse(v))
            .filter(|v| constraint.contains_version(v))
            .collect();
        versions.sort();
        versions.dedup();
        repositories.retain(|v, _| versions.iter().any(|kept| kept.as_str() == v));

        debug!(artifact = %artifact, matched = versions.len(), "resolved version range");
        Ok(VersionRangeResult {
            constraint,
            versions,
            repositories,
            errors,
        })
    }
}
