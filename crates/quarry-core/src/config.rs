use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use quarry_util::errors::{QuarryError, QuarryResult};

use crate::repository::{
    Authentication, ChecksumPolicy, Proxy, RemoteRepository, RepositoryPolicy, UpdatePolicy,
};
use crate::selector::{
    DefaultAuthenticationSelector, DefaultMirrorSelector, DefaultProxySelector, MirrorDefinition,
};

/// Resolver settings, usually loaded from `~/.quarry/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Never touch the network; only the local repository is consulted.
    #[serde(default)]
    pub offline: bool,

    #[serde(default = "default_local_repository")]
    pub local_repository: PathBuf,

    /// `enhanced` tracks where cached artifacts came from, `simple` does not.
    #[serde(default = "default_local_layout")]
    pub local_layout: String,

    /// Overrides every repository's update policy when set.
    #[serde(default)]
    pub update_policy: Option<UpdatePolicy>,

    /// Overrides every repository's checksum policy when set.
    #[serde(default)]
    pub checksum_policy: Option<ChecksumPolicy>,

    #[serde(default = "default_true")]
    pub cache_not_found: bool,

    #[serde(default)]
    pub cache_transfer_errors: bool,

    #[serde(default)]
    pub ignore_missing_descriptors: bool,

    #[serde(default)]
    pub ignore_invalid_descriptors: bool,

    /// Do not add repositories declared by descriptors to the search path.
    #[serde(default)]
    pub ignore_descriptor_repositories: bool,

    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryEntry>,

    #[serde(default)]
    pub mirrors: Vec<MirrorEntry>,

    #[serde(default)]
    pub proxies: Vec<ProxyEntry>,

    #[serde(default)]
    pub credentials: BTreeMap<String, CredentialEntry>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            offline: false,
            local_repository: default_local_repository(),
            local_layout: default_local_layout(),
            update_policy: None,
            checksum_policy: None,
            cache_not_found: true,
            cache_transfer_errors: false,
            ignore_missing_descriptors: false,
            ignore_invalid_descriptors: false,
            ignore_descriptor_repositories: false,
            max_concurrent_downloads: default_max_concurrent_downloads(),
            repositories: BTreeMap::new(),
            mirrors: Vec::new(),
            proxies: Vec::new(),
            credentials: BTreeMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_local_layout() -> String {
    "enhanced".to_string()
}

fn default_max_concurrent_downloads() -> usize {
    4
}

fn default_local_repository() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".m2").join("repository")
}

/// A `[repositories.<id>]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepositoryEntry {
    pub url: String,
    #[serde(default)]
    pub releases: PolicyEntry,
    #[serde(default)]
    pub snapshots: PolicyEntry,
}

/// The `releases` or `snapshots` sub-table of a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub update_policy: UpdatePolicy,
    #[serde(default)]
    pub checksum_policy: ChecksumPolicy,
}

impl Default for PolicyEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            update_policy: UpdatePolicy::default(),
            checksum_policy: ChecksumPolicy::default(),
        }
    }
}

impl From<&PolicyEntry> for RepositoryPolicy {
    fn from(entry: &PolicyEntry) -> Self {
        RepositoryPolicy {
            enabled: entry.enabled,
            update_policy: entry.update_policy,
            checksum_policy: entry.checksum_policy,
        }
    }
}

/// A `[[mirrors]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MirrorEntry {
    pub id: String,
    pub url: String,
    pub mirror_of: String,
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub mirror_of_layouts: String,
    #[serde(default)]
    pub repository_manager: bool,
}

/// A `[[proxies]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyEntry {
    #[serde(default = "default_proxy_protocol")]
    pub protocol: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// `|` or `,` separated host patterns that bypass the proxy.
    #[serde(default)]
    pub non_proxy_hosts: String,
}

fn default_proxy_protocol() -> String {
    "http".to_string()
}

/// Credential entry for a named repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialEntry {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ResolverConfig {
    /// Load the configuration at `path`, or return defaults if the file doesn't exist.
    pub fn load(path: &Path) -> QuarryResult<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| QuarryError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> QuarryResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| QuarryError::Config {
            message: format!("Failed to parse resolver config: {e}"),
        })?;
        if config.max_concurrent_downloads == 0 {
            return Err(QuarryError::Config {
                message: "max-concurrent-downloads must be at least 1".to_string(),
            }
            .into());
        }
        Ok(config)
    }

    /// Returns the default path to the user config file.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        Path::new(&home).join(".quarry").join("config.toml")
    }

    /// The configured remote repositories, with Maven Central as the fallback
    /// when none are declared.
    pub fn remote_repositories(&self) -> Vec<RemoteRepository> {
        if self.repositories.is_empty() {
            return vec![RemoteRepository::maven_central()];
        }
        self.repositories
            .iter()
            .map(|(id, entry)| {
                RemoteRepository::new(id.clone(), entry.url.clone())
                    .with_release_policy((&entry.releases).into())
                    .with_snapshot_policy((&entry.snapshots).into())
            })
            .collect()
    }

    pub fn mirror_selector(&self) -> DefaultMirrorSelector {
        self.mirrors
            .iter()
            .fold(DefaultMirrorSelector::new(), |selector, m| {
                selector.add(MirrorDefinition {
                    id: m.id.clone(),
                    url: m.url.clone(),
                    layout: m.layout.clone(),
                    repository_manager: m.repository_manager,
                    mirror_of: m.mirror_of.clone(),
                    mirror_of_layouts: m.mirror_of_layouts.clone(),
                })
            })
    }

    pub fn proxy_selector(&self) -> DefaultProxySelector {
        self.proxies
            .iter()
            .fold(DefaultProxySelector::new(), |selector, p| {
                let authentication = p.username.as_ref().map(|_| Authentication {
                    username: p.username.clone(),
                    password: p.password.clone(),
                });
                selector.add(
                    Proxy {
                        protocol: p.protocol.clone(),
                        host: p.host.clone(),
                        port: p.port,
                        authentication,
                    },
                    &p.non_proxy_hosts,
                )
            })
    }

    pub fn authentication_selector(&self) -> DefaultAuthenticationSelector {
        self.credentials
            .iter()
            .fold(DefaultAuthenticationSelector::new(), |selector, (id, c)| {
                selector.add(
                    id.clone(),
                    Authentication {
                        username: c.username.clone(),
                        password: c.password.clone(),
                    },
                )
            })
    }
}
