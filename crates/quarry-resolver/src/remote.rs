//! Merging of repository lists as resolution descends into descriptors.

use quarry_core::repository::{RemoteRepository, RepositoryPolicy};

use crate::session::ResolutionSession;

#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteRepositoryManager;

impl RemoteRepositoryManager {
    /// Append `recessive` repositories to `dominant` ones, skipping ids that
    /// are already present.
    ///
    /// `recessive_is_raw` marks repositories straight from a descriptor or a
    /// user: they are first replaced by their mirror, then given the proxy and
    /// credentials the session selects for them. When a mirror turns out to be
    /// present already, the repositories it mirrors and its policies are
    /// merged into the existing entry.
    pub fn aggregate(
        session: &ResolutionSession,
        dominant: &[RemoteRepository],
        recessive: &[RemoteRepository],
        recessive_is_raw: bool,
    ) -> Vec<RemoteRepository> {
        if recessive.is_empty() {
            return dominant.to_vec();
        }

        let mut result = dominant.to_vec();
        let mut added = Vec::new();
        for repository in recessive {
            let mut repository = repository.clone();
            if recessive_is_raw {
                if let Some(mirror) = session.mirror_selector.mirror(&repository) {
                    repository = mirror;
                }
            }

            let existing = result
                .iter_mut()
                .chain(added.iter_mut())
                .find(|r: &&mut RemoteRepository| r.id == repository.id);
            match existing {
                Some(existing) => {
                    if !existing.mirrored.is_empty() && !repository.mirrored.is_empty() {
                        merge_mirrors(existing, &repository);
                    }
                }
                None => added.push(repository),
            }
        }

        if recessive_is_raw {
            for repository in &mut added {
                if repository.authentication.is_none() {
                    repository.authentication =
                        session.authentication_selector.authentication(repository);
                }
                if repository.proxy.is_none() {
                    repository.proxy = session.proxy_selector.proxy(repository);
                }
            }
        }
        result.extend(added);
        result
    }

    /// Repositories supplied by a user, with mirrors, proxies and
    /// credentials applied.
    pub fn prepare(
        session: &ResolutionSession,
        repositories: &[RemoteRepository],
    ) -> Vec<RemoteRepository> {
        Self::aggregate(session, &[], repositories, true)
    }
}

fn merge_mirrors(existing: &mut RemoteRepository, other: &RemoteRepository) {
    for mirrored in &other.mirrored {
        if !existing.mirrored.iter().any(|m| m.id == mirrored.id) {
            existing.mirrored.push(mirrored.clone());
        }
    }
    existing.release_policy = merge_policies(&existing.release_policy, &other.release_policy);
    existing.snapshot_policy = merge_policies(&existing.snapshot_policy, &other.snapshot_policy);
}

/// A policy that is enabled if either is, and as strict as the stricter one.
fn merge_policies(a: &RepositoryPolicy, b: &RepositoryPolicy) -> RepositoryPolicy {
    match (a.enabled, b.enabled) {
        (true, true) => RepositoryPolicy {
            enabled: true,
            update_policy: a.update_policy.stricter(b.update_policy),
            checksum_policy: a.checksum_policy.stricter(b.checksum_policy),
        },
        (true, false) => *a,
        (false, true) => *b,
        (false, false) => *a,
    }
}
