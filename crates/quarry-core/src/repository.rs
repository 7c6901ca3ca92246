//! Repository descriptions: remote repositories with their release/snapshot
//! policies, the local repository, and workspace (reactor) repositories.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use quarry_util::errors::QuarryError;

/// Maven Central base URL.
pub const MAVEN_CENTRAL_URL: &str = "https://repo.maven.apache.org/maven2";

/// Id of the Maven Central repository.
pub const MAVEN_CENTRAL_ID: &str = "central";

/// How stale cached remote data may become before it is fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdatePolicy {
    Never,
    Always,
    #[default]
    Daily,
    /// Refetch once this many minutes have elapsed.
    Interval(u32),
}

impl UpdatePolicy {
    /// Ordinal used to pick the stricter of two policies: a smaller refresh
    /// period is stricter.
    fn period_minutes(self) -> u64 {
        match self {
            UpdatePolicy::Always => 0,
            UpdatePolicy::Interval(n) => u64::from(n),
            UpdatePolicy::Daily => 24 * 60,
            UpdatePolicy::Never => u64::MAX,
        }
    }

    /// The stricter of two policies.
    pub fn stricter(self, other: UpdatePolicy) -> UpdatePolicy {
        if other.period_minutes() < self.period_minutes() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdatePolicy::Never => write!(f, "never"),
            UpdatePolicy::Always => write!(f, "always"),
            UpdatePolicy::Daily => write!(f, "daily"),
            UpdatePolicy::Interval(n) => write!(f, "interval:{n}"),
        }
    }
}

impl FromStr for UpdatePolicy {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "never" => Ok(UpdatePolicy::Never),
            "always" => Ok(UpdatePolicy::Always),
            "daily" | "" => Ok(UpdatePolicy::Daily),
            _ => s
                .strip_prefix("interval:")
                .and_then(|n| n.trim().parse().ok())
                .map(UpdatePolicy::Interval)
                .ok_or_else(|| QuarryError::Config {
                    message: format!(
                        "invalid update policy {s:?}, expected never, always, daily or interval:N"
                    ),
                }),
        }
    }
}

impl Serialize for UpdatePolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UpdatePolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// What to do when a downloaded file does not match its published checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumPolicy {
    Fail,
    #[default]
    Warn,
    Ignore,
}

impl ChecksumPolicy {
    /// The stricter of two policies.
    pub fn stricter(self, other: ChecksumPolicy) -> ChecksumPolicy {
        let rank = |p: ChecksumPolicy| match p {
            ChecksumPolicy::Fail => 0,
            ChecksumPolicy::Warn => 1,
            ChecksumPolicy::Ignore => 2,
        };
        if rank(other) < rank(self) {
            other
        } else {
            self
        }
    }
}

/// Release or snapshot access policy of a remote repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryPolicy {
    pub enabled: bool,
    pub update_policy: UpdatePolicy,
    pub checksum_policy: ChecksumPolicy,
}

impl Default for RepositoryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            update_policy: UpdatePolicy::Daily,
            checksum_policy: ChecksumPolicy::Warn,
        }
    }
}

impl RepositoryPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Credentials for a remote repository.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Authentication {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// An HTTP proxy to reach a remote repository through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proxy {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub authentication: Option<Authentication>,
}

impl Proxy {
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// A remote repository artifacts and metadata can be downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteRepository {
    pub id: String,
    pub url: String,
    /// Repository layout, `default` for the Maven 2 layout.
    pub content_type: String,
    pub release_policy: RepositoryPolicy,
    pub snapshot_policy: RepositoryPolicy,
    /// Repositories this one mirrors, when it was substituted by a mirror selector.
    pub mirrored: Vec<RemoteRepository>,
    pub repository_manager: bool,
    pub authentication: Option<Authentication>,
    pub proxy: Option<Proxy>,
}

impl RemoteRepository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into().trim_end_matches('/').to_string(),
            content_type: "default".to_string(),
            release_policy: RepositoryPolicy::default(),
            snapshot_policy: RepositoryPolicy::default(),
            mirrored: Vec::new(),
            repository_manager: false,
            authentication: None,
            proxy: None,
        }
    }

    /// Construct the default Maven Central repository (snapshots disabled).
    pub fn maven_central() -> Self {
        Self::new(MAVEN_CENTRAL_ID, MAVEN_CENTRAL_URL).with_snapshot_policy(RepositoryPolicy::disabled())
    }

    pub fn with_release_policy(mut self, policy: RepositoryPolicy) -> Self {
        self.release_policy = policy;
        self
    }

    pub fn with_snapshot_policy(mut self, policy: RepositoryPolicy) -> Self {
        self.snapshot_policy = policy;
        self
    }

    pub fn with_authentication(mut self, authentication: Option<Authentication>) -> Self {
        self.authentication = authentication;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<Proxy>) -> Self {
        self.proxy = proxy;
        self
    }

    /// The policy that governs a snapshot or release artifact.
    pub fn policy(&self, snapshot: bool) -> &RepositoryPolicy {
        if snapshot {
            &self.snapshot_policy
        } else {
            &self.release_policy
        }
    }

    /// URL scheme, e.g. `https` or `file`.
    pub fn protocol(&self) -> &str {
        self.url.split_once(':').map(|(p, _)| p).unwrap_or("")
    }

    /// Host part of the URL, empty for `file:` URLs.
    pub fn host(&self) -> &str {
        let Some((_, rest)) = self.url.split_once("://") else {
            return "";
        };
        let authority = rest.split('/').next().unwrap_or("");
        let host_port = authority.rsplit('@').next().unwrap_or(authority);
        host_port.split(':').next().unwrap_or(host_port)
    }

    /// Whether this repository lives on the local machine.
    pub fn is_local(&self) -> bool {
        self.protocol() == "file" || matches!(self.host(), "localhost" | "127.0.0.1")
    }
}

impl fmt::Display for RemoteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

/// The local repository artifacts are cached in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalRepository {
    pub basedir: PathBuf,
    /// `enhanced` or `simple`.
    pub content_type: String,
}

impl LocalRepository {
    pub fn new(basedir: impl Into<PathBuf>) -> Self {
        Self {
            basedir: basedir.into(),
            content_type: "enhanced".to_string(),
        }
    }

    pub fn basedir(&self) -> &Path {
        &self.basedir
    }
}

/// An in-process source of artifacts, e.g. the modules of a multi-module build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceRepository {
    pub id: String,
}

impl Default for WorkspaceRepository {
    fn default() -> Self {
        Self {
            id: "workspace".to_string(),
        }
    }
}

/// The repository a version or file was obtained from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactRepository {
    Remote(RemoteRepository),
    Local(LocalRepository),
    Workspace(WorkspaceRepository),
}

impl ArtifactRepository {
    pub fn id(&self) -> &str {
        match self {
            ArtifactRepository::Remote(r) => &r.id,
            ArtifactRepository::Local(_) => "local",
            ArtifactRepository::Workspace(w) => &w.id,
        }
    }

    pub fn as_remote(&self) -> Option<&RemoteRepository> {
        match self {
            ArtifactRepository::Remote(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactRepository::Remote(r) => write!(f, "{r}"),
            ArtifactRepository::Local(l) => write!(f, "local ({})", l.basedir.display()),
            ArtifactRepository::Workspace(w) => write!(f, "{}", w.id),
        }
    }
}
