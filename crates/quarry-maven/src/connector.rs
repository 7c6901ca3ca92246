//! Repository connectors: batched transfers to and from one remote repository.
//!
//! Every item of a batch carries its own outcome; a connector never fails a
//! batch as a whole.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use quarry_core::artifact::Artifact;
use quarry_core::metadata::Metadata;
use quarry_core::repository::{ChecksumPolicy, RemoteRepository};
use quarry_util::errors::QuarryError;

use crate::file::FileRepositoryConnector;
use crate::http::HttpRepositoryConnector;
use crate::transfer::TransferError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct ArtifactDownload {
    pub artifact: Artifact,
    /// Destination in the local repository.
    pub file: PathBuf,
    pub checksum_policy: ChecksumPolicy,
    pub error: Option<TransferError>,
}

impl ArtifactDownload {
    pub fn new(artifact: Artifact, file: PathBuf, checksum_policy: ChecksumPolicy) -> Self {
        Self {
            artifact,
            file,
            checksum_policy,
            error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataDownload {
    pub metadata: Metadata,
    pub file: PathBuf,
    pub checksum_policy: ChecksumPolicy,
    pub error: Option<TransferError>,
}

impl MetadataDownload {
    pub fn new(metadata: Metadata, file: PathBuf, checksum_policy: ChecksumPolicy) -> Self {
        Self {
            metadata,
            file,
            checksum_policy,
            error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactUpload {
    pub artifact: Artifact,
    /// Local file to upload.
    pub file: PathBuf,
    pub error: Option<TransferError>,
}

#[derive(Debug, Clone)]
pub struct MetadataUpload {
    pub metadata: Metadata,
    pub file: PathBuf,
    pub error: Option<TransferError>,
}

#[async_trait]
pub trait RepositoryConnector: Send + Sync {
    /// Download every item, recording each outcome in its `error` field.
    async fn get(&self, artifacts: &mut [ArtifactDownload], metadata: &mut [MetadataDownload]);

    async fn put(&self, artifacts: &mut [ArtifactUpload], metadata: &mut [MetadataUpload]);
}

/// No registered connector can talk to a repository.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("No connector available to access repository {repository} ({url}) of type {content_type}")]
#[diagnostic(help("Supported repositories use the default layout over file://, http:// or https://"))]
pub struct NoConnectorError {
    pub repository: String,
    pub url: String,
    pub content_type: String,
}

pub trait RepositoryConnectorProvider: Send + Sync {
    fn connector(
        &self,
        repository: &RemoteRepository,
    ) -> Result<Arc<dyn RepositoryConnector>, NoConnectorError>;
}

/// Connects `file://` repositories directly and `http(s)://` repositories
/// through one shared HTTP client.
#[derive(Debug, Clone)]
pub struct DefaultConnectorProvider {
    client: reqwest::Client,
}

impl DefaultConnectorProvider {
    pub fn new() -> Result<Self, QuarryError> {
        Ok(Self {
            client: build_client()?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl RepositoryConnectorProvider for DefaultConnectorProvider {
    fn connector(
        &self,
        repository: &RemoteRepository,
    ) -> Result<Arc<dyn RepositoryConnector>, NoConnectorError> {
        let no_connector = || NoConnectorError {
            repository: repository.id.clone(),
            url: repository.url.clone(),
            content_type: repository.content_type.clone(),
        };
        if repository.content_type != "default" {
            return Err(no_connector());
        }
        match repository.protocol() {
            "file" => FileRepositoryConnector::new(repository.clone())
                .map(|c| Arc::new(c) as Arc<dyn RepositoryConnector>)
                .ok_or_else(no_connector),
            "http" | "https" => Ok(Arc::new(HttpRepositoryConnector::new(
                self.client.clone(),
                repository.clone(),
            ))),
            _ => Err(no_connector()),
        }
    }
}

/// Build a shared reqwest client for repository downloads.
pub fn build_client() -> Result<reqwest::Client, QuarryError> {
    client_builder()
        .build()
        .map_err(|e| QuarryError::Network {
            message: format!("Failed to create HTTP client: {e}"),
        })
}

pub(crate) fn client_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("quarry/", env!("CARGO_PKG_VERSION")))
}

/// Write `data` to `dest` through a temp file in the same directory so that
/// readers never observe a partial file.
pub(crate) fn persist(dest: &std::path::Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    quarry_util::fs::ensure_parent(dest)?;
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}
