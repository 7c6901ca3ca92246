//! Mirror, proxy and authentication selection for remote repositories.
//!
//! Selectors are pure lookups from a repository description to a replacement
//! repository, a proxy or a credential set. They are shared across tasks, so
//! every implementation is `Send + Sync`.

use std::collections::HashMap;

use regex::Regex;
use tracing::debug;

use crate::repository::{Authentication, Proxy, RemoteRepository};

const WILDCARD: &str = "*";
const EXTERNAL_WILDCARD: &str = "external:*";

pub trait MirrorSelector: Send + Sync {
    /// The mirror that should be used instead of `repository`, if any.
    fn mirror(&self, repository: &RemoteRepository) -> Option<RemoteRepository>;
}

pub trait ProxySelector: Send + Sync {
    fn proxy(&self, repository: &RemoteRepository) -> Option<Proxy>;
}

pub trait AuthenticationSelector: Send + Sync {
    fn authentication(&self, repository: &RemoteRepository) -> Option<Authentication>;
}

/// A configured mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorDefinition {
    pub id: String,
    pub url: String,
    /// Layout of the mirror itself; empty keeps the mirrored repository's layout.
    pub layout: String,
    pub repository_manager: bool,
    /// Repository id pattern: `id`, `a,b`, `!id`, `*` or `external:*`.
    pub mirror_of: String,
    /// Layout pattern the mirrored repository must match; empty matches any.
    pub mirror_of_layouts: String,
}

#[derive(Debug, Default, Clone)]
pub struct DefaultMirrorSelector {
    mirrors: Vec<MirrorDefinition>,
}

impl DefaultMirrorSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, mirror: MirrorDefinition) -> Self {
        self.mirrors.push(mirror);
        self
    }

    fn find(&self, repository: &RemoteRepository) -> Option<&MirrorDefinition> {
        let layout_ok = |m: &&MirrorDefinition| {
            matches_layout(&repository.content_type, &m.mirror_of_layouts)
        };
        // An exact id match beats any pattern, regardless of declaration order.
        self.mirrors
            .iter()
            .filter(layout_ok)
            .find(|m| m.mirror_of == repository.id)
            .or_else(|| {
                self.mirrors
                    .iter()
                    .filter(layout_ok)
                    .find(|m| matches_pattern(repository, &m.mirror_of))
            })
    }
}

impl MirrorSelector for DefaultMirrorSelector {
    fn mirror(&self, repository: &RemoteRepository) -> Option<RemoteRepository> {
        let def = self.find(repository)?;
        debug!(repository = %repository.id, mirror = %def.id, "using mirror");
        let mut mirror = RemoteRepository::new(def.id.clone(), def.url.clone())
            .with_release_policy(repository.release_policy)
            .with_snapshot_policy(repository.snapshot_policy);
        mirror.content_type = if def.layout.is_empty() {
            repository.content_type.clone()
        } else {
            def.layout.clone()
        };
        mirror.repository_manager = def.repository_manager;
        mirror.mirrored = vec![repository.clone()];
        Some(mirror)
    }
}

/// Whether `repository` matches a mirror-of pattern.
///
/// Entries are evaluated left to right; an explicit `!id` exclusion ends the
/// evaluation with a negative result even after a wildcard matched.
pub fn matches_pattern(repository: &RemoteRepository, pattern: &str) -> bool {
    if pattern == WILDCARD || pattern == repository.id {
        return true;
    }
    let mut result = false;
    for entry in pattern.split(',').map(str::trim) {
        if let Some(excluded) = entry.strip_prefix('!').filter(|e| !e.is_empty()) {
            if excluded == repository.id {
                return false;
            }
        } else if entry == repository.id {
            return true;
        } else if entry == EXTERNAL_WILDCARD && !repository.is_local() {
            result = true;
        } else if entry == WILDCARD {
            result = true;
        }
    }
    result
}

fn matches_layout(layout: &str, pattern: &str) -> bool {
    if pattern.is_empty() || pattern == WILDCARD || pattern == layout {
        return true;
    }
    let mut result = false;
    for entry in pattern.split(',').map(str::trim) {
        if let Some(excluded) = entry.strip_prefix('!').filter(|e| !e.is_empty()) {
            if excluded == layout {
                return false;
            }
        } else if entry == layout || entry == WILDCARD {
            result = true;
        }
    }
    result
}

/// A proxy together with the hosts that bypass it.
#[derive(Debug, Clone)]
struct ProxyDefinition {
    proxy: Proxy,
    non_proxy_hosts: Vec<Regex>,
}

#[derive(Debug, Default, Clone)]
pub struct DefaultProxySelector {
    proxies: Vec<ProxyDefinition>,
}

impl DefaultProxySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a proxy. `non_proxy_hosts` is a `|` or `,` separated list of
    /// host patterns where `*` matches any run of characters.
    pub fn add(mut self, proxy: Proxy, non_proxy_hosts: &str) -> Self {
        let non_proxy_hosts = non_proxy_hosts
            .split(['|', ','])
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .filter_map(|h| host_pattern(h).ok())
            .collect();
        self.proxies.push(ProxyDefinition {
            proxy,
            non_proxy_hosts,
        });
        self
    }
}

fn host_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(&pattern.to_ascii_lowercase()).replace(r"\*", ".*");
    Regex::new(&format!("^{escaped}$"))
}

impl ProxySelector for DefaultProxySelector {
    fn proxy(&self, repository: &RemoteRepository) -> Option<Proxy> {
        let host = repository.host().to_ascii_lowercase();
        let protocol = repository.protocol();
        self.proxies
            .iter()
            .filter(|d| d.proxy.protocol.eq_ignore_ascii_case(protocol))
            .find(|d| !d.non_proxy_hosts.iter().any(|p| p.is_match(&host)))
            .map(|d| d.proxy.clone())
    }
}

/// Credentials keyed by repository id.
#[derive(Debug, Default, Clone)]
pub struct DefaultAuthenticationSelector {
    by_id: HashMap<String, Authentication>,
}

impl DefaultAuthenticationSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, repository_id: impl Into<String>, auth: Authentication) -> Self {
        self.by_id.insert(repository_id.into(), auth);
        self
    }
}

impl AuthenticationSelector for DefaultAuthenticationSelector {
    fn authentication(&self, repository: &RemoteRepository) -> Option<Authentication> {
        self.by_id.get(&repository.id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: &str, url: &str) -> RemoteRepository {
        RemoteRepository::new(id, url)
    }

    #[test]
    fn pattern_negation_wins_over_wildcard() {
        let central = repo("central", "https://repo.maven.apache.org/maven2");
        assert!(matches_pattern(&central, "*"));
        assert!(matches_pattern(&central, "a,central"));
        assert!(!matches_pattern(&central, "*,!central"));
        assert!(!matches_pattern(&central, "other"));
    }

    #[test]
    fn external_wildcard_skips_local_repositories() {
        let local = repo("local", "file:///srv/repo");
        let remote = repo("remote", "https://example.com/repo");
        assert!(!matches_pattern(&local, "external:*"));
        assert!(matches_pattern(&remote, "external:*"));
    }

    #[test]
    fn layout_patterns() {
        assert!(matches_layout("default", ""));
        assert!(matches_layout("default", "default,legacy"));
        assert!(!matches_layout("legacy", "*,!legacy"));
    }
}
