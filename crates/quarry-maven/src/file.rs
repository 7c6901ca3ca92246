//! Connector for repositories on the local filesystem (`file://` URLs).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use quarry_core::repository::{ChecksumPolicy, RemoteRepository};
use quarry_util::hash::ChecksumAlgorithm;

use crate::checksum::{self, Verification};
use crate::connector::{
    persist, ArtifactDownload, ArtifactUpload, MetadataDownload, MetadataUpload,
    RepositoryConnector,
};
use crate::layout;
use crate::transfer::TransferError;

#[derive(Debug, Clone)]
pub struct FileRepositoryConnector {
    repository: RemoteRepository,
    basedir: PathBuf,
}

impl FileRepositoryConnector {
    /// `None` when the repository URL is not a `file:` URL.
    pub fn new(repository: RemoteRepository) -> Option<Self> {
        let basedir = file_url_path(&repository.url)?;
        Some(Self {
            repository,
            basedir,
        })
    }

    async fn fetch(
        &self,
        item: &str,
        relative: &str,
        dest: &Path,
        policy: ChecksumPolicy,
    ) -> Result<(), TransferError> {
        let source = self.basedir.join(relative);
        let url = layout::url(&self.repository, relative);
        let data = match tokio::fs::read(&source).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TransferError::NotFound {
                    item: item.to_string(),
                    repository: self.repository.id.clone(),
                    url,
                    cached: false,
                });
            }
            Err(e) => return Err(self.transfer_error(item, &url, e)),
        };

        if policy != ChecksumPolicy::Ignore {
            let verification = self.verify(&source, &data).await;
            checksum::enforce(policy, &verification, item, &self.repository.id, &url)?;
        }

        persist(dest, &data).map_err(|e| self.transfer_error(item, &url, e))?;
        debug!("copied {} to {}", source.display(), dest.display());
        Ok(())
    }

    async fn verify(&self, source: &Path, data: &[u8]) -> Verification {
        for algorithm in ChecksumAlgorithm::ALL {
            let mut sidecar = source.as_os_str().to_owned();
            sidecar.push(".");
            sidecar.push(algorithm.extension());
            if let Ok(content) = tokio::fs::read_to_string(PathBuf::from(sidecar)).await {
                return checksum::compare(data, algorithm, &content);
            }
        }
        Verification::NoSidecar
    }

    async fn store(&self, item: &str, relative: &str, source: &Path) -> Result<(), TransferError> {
        let dest = self.basedir.join(relative);
        let url = layout::url(&self.repository, relative);
        let data = tokio::fs::read(source)
            .await
            .map_err(|e| self.transfer_error(item, &url, e))?;
        persist(&dest, &data).map_err(|e| self.transfer_error(item, &url, e))?;
        for algorithm in [ChecksumAlgorithm::Sha1, ChecksumAlgorithm::Md5] {
            let sidecar = self
                .basedir
                .join(layout::checksum_path(relative, algorithm));
            persist(&sidecar, algorithm.hex_bytes(&data).as_bytes())
                .map_err(|e| self.transfer_error(item, &url, e))?;
        }
        Ok(())
    }

    fn transfer_error(&self, item: &str, url: &str, e: std::io::Error) -> TransferError {
        TransferError::Transfer {
            item: item.to_string(),
            repository: self.repository.id.clone(),
            url: url.to_string(),
            message: e.to_string(),
            cached: false,
        }
    }
}

#[async_trait]
impl RepositoryConnector for FileRepositoryConnector {
    async fn get(&self, artifacts: &mut [ArtifactDownload], metadata: &mut [MetadataDownload]) {
        for download in artifacts.iter_mut() {
            let relative = layout::artifact_path(&download.artifact);
            download.error = self
                .fetch(
                    &download.artifact.to_string(),
                    &relative,
                    &download.file,
                    download.checksum_policy,
                )
                .await
                .err();
        }
        for download in metadata.iter_mut() {
            let relative = layout::metadata_path(&download.metadata);
            download.error = self
                .fetch(
                    &download.metadata.to_string(),
                    &relative,
                    &download.file,
                    download.checksum_policy,
                )
                .await
                .err();
        }
    }

    async fn put(&self, artifacts: &mut [ArtifactUpload], metadata: &mut [MetadataUpload]) {
        for upload in artifacts.iter_mut() {
            let relative = layout::artifact_path(&upload.artifact);
            upload.error = self
                .store(&upload.artifact.to_string(), &relative, &upload.file)
                .await
                .err();
        }
        for upload in metadata.iter_mut() {
            let relative = layout::metadata_path(&upload.metadata);
            upload.error = self
                .store(&upload.metadata.to_string(), &relative, &upload.file)
                .await
                .err();
        }
    }
}

/// Filesystem path of a `file:` URL: `file:///srv/repo` and `file:/srv/repo`
/// both give `/srv/repo`. `%20` escapes are decoded.
pub fn file_url_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("file:")?;
    let path = match rest.strip_prefix("//") {
        // `file://host/path` is not supported, only an empty or `localhost` host.
        Some(after) => {
            let after = after.strip_prefix("localhost").unwrap_or(after);
            if !after.starts_with('/') {
                return None;
            }
            after
        }
        None => rest,
    };
    Some(PathBuf::from(path.replace("%20", " ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_urls() {
        assert_eq!(file_url_path("file:///srv/repo"), Some(PathBuf::from("/srv/repo")));
        assert_eq!(file_url_path("file:/srv/repo"), Some(PathBuf::from("/srv/repo")));
        assert_eq!(
            file_url_path("file://localhost/srv/my%20repo"),
            Some(PathBuf::from("/srv/my repo"))
        );
        assert_eq!(file_url_path("file://server/share"), None);
        assert_eq!(file_url_path("https://example.com"), None);
    }
}
