//! Connector for repositories served over HTTP(S).
//!
//! Credentials configured for a repository are sent with every request:
//! username and password as basic auth, a lone password as a bearer token.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, warn};

use quarry_core::repository::{ChecksumPolicy, Proxy, RemoteRepository};
use quarry_util::hash::ChecksumAlgorithm;

use crate::checksum::{self, Verification};
use crate::connector::{
    client_builder, persist, ArtifactDownload, ArtifactUpload, MetadataDownload,
    MetadataUpload, RepositoryConnector,
};
use crate::layout;
use crate::transfer::TransferError;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct HttpRepositoryConnector {
    client: Client,
    repository: RemoteRepository,
}

/// Failure of a single request, before it is tied to an item.
enum Fetch {
    NotFound,
    Failed(String),
}

impl HttpRepositoryConnector {
    /// A repository with a proxy gets its own client routed through it;
    /// otherwise the shared client is used.
    pub fn new(client: Client, repository: RemoteRepository) -> Self {
        let client = match &repository.proxy {
            Some(proxy) => proxied_client(proxy).unwrap_or_else(|e| {
                warn!("Ignoring proxy {} for {}: {e}", proxy.url(), repository.id);
                client
            }),
            None => client,
        };
        Self { client, repository }
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        let Some(auth) = &self.repository.authentication else {
            return request;
        };
        match (&auth.username, &auth.password) {
            (Some(user), Some(pass)) => request.basic_auth(user, Some(pass)),
            (Some(user), None) => request.basic_auth(user, None::<&str>),
            (None, Some(token)) => request.bearer_auth(token),
            (None, None) => request,
        }
    }

    /// GET with retries on server errors, timeouts and connect failures.
    async fn download(&self, url: &str) -> Result<Vec<u8>, Fetch> {
        let mut last_err = String::new();

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(RETRY_DELAY * attempt).await;
            }

            let request = self.authenticate(self.client.get(url));
            match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::NOT_FOUND {
                        return Err(Fetch::NotFound);
                    }
                    if status.is_server_error() {
                        last_err = format!("HTTP {status}");
                        continue;
                    }
                    if !status.is_success() {
                        return Err(Fetch::Failed(format!("HTTP {status}")));
                    }
                    return resp
                        .bytes()
                        .await
                        .map(|b| b.to_vec())
                        .map_err(|e| Fetch::Failed(format!("Failed to read response: {e}")));
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    last_err = e.to_string();
                    continue;
                }
                Err(e) => return Err(Fetch::Failed(format!("Request failed: {e}"))),
            }
        }

        Err(Fetch::Failed(format!(
            "Failed after {MAX_RETRIES} retries: {last_err}"
        )))
    }

    async fn fetch(
        &self,
        item: &str,
        relative: &str,
        dest: &Path,
        policy: ChecksumPolicy,
    ) -> Result<(), TransferError> {
        let url = layout::url(&self.repository, relative);
        debug!("GET {url}");
        let data = match self.download(&url).await {
            Ok(data) => data,
            Err(Fetch::NotFound) => {
                return Err(TransferError::NotFound {
                    item: item.to_string(),
                    repository: self.repository.id.clone(),
                    url,
                    cached: false,
                });
            }
            Err(Fetch::Failed(message)) => return Err(self.transfer_error(item, &url, message)),
        };

        if policy != ChecksumPolicy::Ignore {
            let verification = self.verify(relative, &data).await;
            checksum::enforce(policy, &verification, item, &self.repository.id, &url)?;
        }

        persist(dest, &data).map_err(|e| self.transfer_error(item, &url, e.to_string()))
    }

    /// Check `data` against the first sidecar the repository publishes.
    async fn verify(&self, relative: &str, data: &[u8]) -> Verification {
        for algorithm in ChecksumAlgorithm::ALL {
            let url = layout::url(
                &self.repository,
                &layout::checksum_path(relative, algorithm),
            );
            match self.download(&url).await {
                Ok(content) => {
                    return checksum::compare(data, algorithm, &String::from_utf8_lossy(&content));
                }
                Err(Fetch::NotFound) => continue,
                Err(Fetch::Failed(message)) => {
                    debug!("Could not fetch {url}: {message}");
                    continue;
                }
            }
        }
        Verification::NoSidecar
    }

    async fn upload(&self, url: &str, body: Vec<u8>) -> Result<(), String> {
        let request = self.authenticate(self.client.put(url)).body(body);
        let resp = request
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {status}"))
        }
    }

    async fn store(&self, item: &str, relative: &str, source: &Path) -> Result<(), TransferError> {
        let url = layout::url(&self.repository, relative);
        let data = tokio::fs::read(source)
            .await
            .map_err(|e| self.transfer_error(item, &url, e.to_string()))?;
        let sidecars: Vec<_> = [ChecksumAlgorithm::Sha1, ChecksumAlgorithm::Md5]
            .into_iter()
            .map(|algorithm| (algorithm, algorithm.hex_bytes(&data)))
            .collect();

        debug!("PUT {url}");
        self.upload(&url, data)
            .await
            .map_err(|m| self.transfer_error(item, &url, m))?;
        for (algorithm, hash) in sidecars {
            let sidecar = layout::url(
                &self.repository,
                &layout::checksum_path(relative, algorithm),
            );
            self.upload(&sidecar, hash.into_bytes())
                .await
                .map_err(|m| self.transfer_error(item, &sidecar, m))?;
        }
        Ok(())
    }

    fn transfer_error(&self, item: &str, url: &str, message: String) -> TransferError {
        TransferError::Transfer {
            item: item.to_string(),
            repository: self.repository.id.clone(),
            url: url.to_string(),
            message,
            cached: false,
        }
    }
}

#[async_trait]
impl RepositoryConnector for HttpRepositoryConnector {
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

fn proxied_client(proxy: &Proxy) -> Result<Client, reqwest::Error> {
    let mut route = reqwest::Proxy::all(proxy.url())?;
    if let Some(auth) = &proxy.authentication {
        if let Some(user) = &auth.username {
            route = route.basic_auth(user, auth.password.as_deref().unwrap_or(""));
        }
    }
    client_builder().proxy(route).build()
}
