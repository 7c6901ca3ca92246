//! Session-scoped caches.
//!
//! A [`DataPool`] lives as long as the session that owns it and is shared by
//! every operation run with that session, so a descriptor or version range
//! seen once is not read again during the same build.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use quarry_core::artifact::Artifact;
use quarry_core::repository::RemoteRepository;

use crate::descriptor::ArtifactDescriptorResult;
use crate::range_resolver::VersionRangeResult;

#[derive(Debug, Default)]
pub struct DataPool {
    descriptors: Mutex<HashMap<String, Arc<ArtifactDescriptorResult>>>,
    ranges: Mutex<HashMap<String, Arc<VersionRangeResult>>>,
}

impl DataPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor(
        &self,
        artifact: &Artifact,
        repositories: &[RemoteRepository],
    ) -> Option<Arc<ArtifactDescriptorResult>> {
        let key = pool_key(artifact, repositories);
        self.descriptors
            .lock()
            .ok()
            .and_then(|map| map.get(&key).cloned())
    }

    pub fn put_descriptor(
        &self,
        artifact: &Artifact,
        repositories: &[RemoteRepository],
        result: Arc<ArtifactDescriptorResult>,
    ) {
        if let Ok(mut map) = self.descriptors.lock() {
            map.insert(pool_key(artifact, repositories), result);
        }
    }

    pub fn range(
        &self,
        artifact: &Artifact,
        repositories: &[RemoteRepository],
    ) -> Option<Arc<VersionRangeResult>> {
        let key = pool_key(artifact, repositories);
        self.ranges.lock().ok().and_then(|map| map.get(&key).cloned())
    }

    pub fn put_range(
        &self,
        artifact: &Artifact,
        repositories: &[RemoteRepository],
        result: Arc<VersionRangeResult>,
    ) {
        if let Ok(mut map) = self.ranges.lock() {
            map.insert(pool_key(artifact, repositories), result);
        }
    }
}

/// The same coordinate read through different repositories may differ, so
/// repository ids are part of the key.
fn pool_key(artifact: &Artifact, repositories: &[RemoteRepository]) -> String {
    let ids: Vec<&str> = repositories.iter().map(|r| r.id.as_str()).collect();
    format!("{}@{}", artifact.key(), ids.join(","))
}

/// Tracks which coordinates have been visited while following a chain of
/// redirects (relocations, parents) to detect cycles.
#[derive(Debug, Default)]
pub struct VisitedSet {
    visited: HashSet<String>,
    chain: Vec<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a coordinate as visited. Returns `false` if already visited.
    pub fn visit(&mut self, group: &str, artifact: &str, version: &str) -> bool {
        let key = format!("{group}:{artifact}:{version}");
        self.chain.push(key.clone());
        self.visited.insert(key)
    }

    /// Every visit in order, including a repeated last one.
    pub fn chain(&self) -> &[String] {
        &self.chain
    }
}
