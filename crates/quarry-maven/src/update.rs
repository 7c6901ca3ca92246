//! Update checks: whether a cached artifact or metadata file must be fetched
//! again, with negative caching of not-found and transfer failures.
//!
//! Artifacts are tracked in `<file>.lastUpdated` next to the (possibly
//! missing) file with the keys `<repo>.lastUpdated` and `<repo>.error`.
//! Metadata is tracked in the directory's `resolver-status.properties` with
//! the keys `<file name>/<repo>.lastUpdated` and `<file name>/<repo>.error`.
//! An empty `.error` value records a missing item.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use quarry_core::artifact::Artifact;
use quarry_core::metadata::Metadata;
use quarry_core::repository::{RemoteRepository, UpdatePolicy};
use quarry_util::fs::{modified_millis, now_millis};

use crate::layout;
use crate::tracking::TrackingFileManager;
use crate::transfer::TransferError;

const MINUTE_MS: u64 = 60 * 1000;
const DAY_MS: u64 = 24 * 60 * MINUTE_MS;

/// File holding the status of every metadata file of one directory.
pub const METADATA_STATUS_FILE: &str = "resolver-status.properties";

/// Update policy evaluation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UpdatePolicyAnalyzer;

impl UpdatePolicyAnalyzer {
    /// Whether data last checked at `last_modified` (epoch millis, 0 when
    /// unknown) is stale at `now` under `policy`.
    ///
    /// `daily` compares against the most recent UTC midnight.
    pub fn is_update_required(now: u64, last_modified: u64, policy: UpdatePolicy) -> bool {
        match policy {
            UpdatePolicy::Always => true,
            UpdatePolicy::Never => false,
            UpdatePolicy::Daily => {
                let midnight = now / DAY_MS * DAY_MS;
                last_modified < midnight
            }
            UpdatePolicy::Interval(minutes) => {
                let window = u64::from(minutes) * MINUTE_MS;
                last_modified < now.saturating_sub(window)
            }
        }
    }

    /// The stricter of two policies, used when one item is governed by both
    /// the release and the snapshot policy.
    pub fn effective_policy(a: UpdatePolicy, b: UpdatePolicy) -> UpdatePolicy {
        a.stricter(b)
    }
}

/// What is being checked.
#[derive(Debug, Clone)]
pub enum UpdateItem {
    Artifact(Artifact),
    Metadata(Metadata),
}

impl UpdateItem {
    fn relative_path(&self) -> String {
        match self {
            UpdateItem::Artifact(a) => layout::artifact_path(a),
            UpdateItem::Metadata(m) => layout::metadata_path(m),
        }
    }
}

impl std::fmt::Display for UpdateItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateItem::Artifact(a) => write!(f, "{a}"),
            UpdateItem::Metadata(m) => write!(f, "{m}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateCheck {
    pub item: UpdateItem,
    /// Where the item is (or would be) cached.
    pub file: PathBuf,
    pub repository: RemoteRepository,
    pub policy: UpdatePolicy,
    /// Caller-known time of the last successful update, 0 when unknown.
    pub local_last_updated: u64,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCheckResult {
    pub required: bool,
    /// A cached failure replayed instead of contacting the repository.
    pub error: Option<TransferError>,
}

/// Decides whether items must be fetched and records the outcome of fetches.
#[derive(Debug, Clone)]
pub struct UpdateCheckManager {
    tracking: TrackingFileManager,
    cache_not_found: bool,
    cache_transfer_errors: bool,
    clock: fn() -> u64,
}

impl Default for UpdateCheckManager {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl UpdateCheckManager {
    pub fn new(cache_not_found: bool, cache_transfer_errors: bool) -> Self {
        Self {
            tracking: TrackingFileManager::new(),
            cache_not_found,
            cache_transfer_errors,
            clock: now_millis,
        }
    }

    /// Use a fixed clock, for deterministic checks.
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    pub fn check(&self, check: &UpdateCheck) -> UpdateCheckResult {
        let now = (self.clock)();
        let (touch, data_key, error_key) = tracking_keys(check);
        let records = self.tracking.read(&touch).unwrap_or_default();
        let file_exists = check.file.is_file();

        let mut last_updated = check.local_last_updated;
        if last_updated == 0 {
            last_updated = records
                .get(&data_key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
        }
        if last_updated == 0 && file_exists {
            last_updated = modified_millis(&check.file).unwrap_or(0);
        }

        if file_exists {
            let required =
                UpdatePolicyAnalyzer::is_update_required(now, last_updated, check.policy);
            debug!(item = %check.item, repository = %check.repository.id, required, "update check");
            return UpdateCheckResult {
                required,
                error: None,
            };
        }

        let Some(error) = records.get(&error_key) else {
            return UpdateCheckResult {
                required: true,
                error: None,
            };
        };
        if last_updated == 0 {
            return UpdateCheckResult {
                required: true,
                error: None,
            };
        }

        let not_found = error.is_empty();
        let caching = if not_found {
            self.cache_not_found
        } else {
            self.cache_transfer_errors
        };
        let stale = UpdatePolicyAnalyzer::is_update_required(now, last_updated, check.policy);
        if !caching || stale {
            return UpdateCheckResult {
                required: true,
                error: None,
            };
        }

        let url = layout::url(&check.repository, &check.item.relative_path());
        let replay = if not_found {
            TransferError::NotFound {
                item: check.item.to_string(),
                repository: check.repository.id.clone(),
                url,
                cached: true,
            }
        } else {
            TransferError::Transfer {
                item: check.item.to_string(),
                repository: check.repository.id.clone(),
                url,
                message: error.clone(),
                cached: true,
            }
        };
        debug!(item = %check.item, repository = %check.repository.id, "replaying cached failure");
        UpdateCheckResult {
            required: false,
            error: Some(replay),
        }
    }

    /// Record the outcome of a fetch: `None` for success.
    pub fn touch(&self, check: &UpdateCheck, error: Option<&TransferError>) {
        let (touch, data_key, error_key) = tracking_keys(check);
        let mut updates = BTreeMap::new();
        updates.insert(data_key, Some((self.clock)().to_string()));
        updates.insert(error_key, error.map(TransferError::tracking_message));
        if let Err(e) = self.tracking.update(&touch, &updates) {
            warn!("Failed to record update check in {}: {e}", touch.display());
        }
    }
}

/// Repository key used in tracking files: the URL with every character
/// other than ASCII alphanumerics, `.` and `-` replaced by `_`.
pub fn repository_key(repository: &RemoteRepository) -> String {
    repository
        .url
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn tracking_keys(check: &UpdateCheck) -> (PathBuf, String, String) {
    let repo_key = repository_key(&check.repository);
    match check.item {
        UpdateItem::Artifact(_) => {
            let mut touch = check.file.clone().into_os_string();
            touch.push(".lastUpdated");
            (
                PathBuf::from(touch),
                format!("{repo_key}.lastUpdated"),
                format!("{repo_key}.error"),
            )
        }
        UpdateItem::Metadata(_) => {
            let name = file_name(&check.file);
            let dir = check.file.parent().unwrap_or(Path::new("."));
            (
                dir.join(METADATA_STATUS_FILE),
                format!("{name}/{repo_key}.lastUpdated"),
                format!("{name}/{repo_key}.error"),
            )
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOON: u64 = 1_700_000_000_000 / DAY_MS * DAY_MS + 12 * 60 * MINUTE_MS;

    #[test]
    fn always_and_never() {
        assert!(UpdatePolicyAnalyzer::is_update_required(NOON, NOON, UpdatePolicy::Always));
        assert!(!UpdatePolicyAnalyzer::is_update_required(NOON, 0, UpdatePolicy::Never));
    }

    #[test]
    fn daily_uses_utc_midnight() {
        let this_morning = NOON - 6 * 60 * MINUTE_MS;
        let yesterday_evening = NOON - 13 * 60 * MINUTE_MS;
        assert!(!UpdatePolicyAnalyzer::is_update_required(NOON, this_morning, UpdatePolicy::Daily));
        assert!(UpdatePolicyAnalyzer::is_update_required(NOON, yesterday_evening, UpdatePolicy::Daily));
    }

    #[test]
    fn interval_in_minutes() {
        let policy = UpdatePolicy::Interval(30);
        assert!(!UpdatePolicyAnalyzer::is_update_required(NOON, NOON - 10 * MINUTE_MS, policy));
        assert!(UpdatePolicyAnalyzer::is_update_required(NOON, NOON - 31 * MINUTE_MS, policy));
    }

    #[test]
    fn repository_key_is_filesystem_safe() {
        let repo = RemoteRepository::new("c", "https://repo.maven.apache.org/maven2");
        assert_eq!(repository_key(&repo), "https___repo.maven.apache.org_maven2");
    }
}
