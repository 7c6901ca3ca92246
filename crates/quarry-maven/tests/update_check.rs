use std::path::Path;

use quarry_core::artifact::Artifact;
use quarry_core::metadata::{Metadata, Nature};
use quarry_core::repository::{RemoteRepository, UpdatePolicy};
use quarry_maven::transfer::TransferError;
use quarry_maven::update::{UpdateCheck, UpdateCheckManager, UpdateItem, METADATA_STATUS_FILE};

const NOW: u64 = 1_700_000_000_000;

fn fixed_clock() -> u64 {
    NOW
}

fn later_clock() -> u64 {
    NOW + 365 * 24 * 60 * 60 * 1000
}

fn central() -> RemoteRepository {
    RemoteRepository::new("central", "https://repo.example.com/maven2")
}

fn artifact_check(file: &Path, policy: UpdatePolicy) -> UpdateCheck {
    UpdateCheck {
        item: UpdateItem::Artifact(Artifact::new("org.example", "lib", "", "jar", "1.0")),
        file: file.to_path_buf(),
        repository: central(),
        policy,
        local_last_updated: 0,
    }
}

fn not_found() -> TransferError {
    TransferError::NotFound {
        item: "org.example:lib:jar:1.0".into(),
        repository: "central".into(),
        url: "https://repo.example.com/maven2/org/example/lib/1.0/lib-1.0.jar".into(),
        cached: false,
    }
}

#[test]
fn never_policy_keeps_existing_file_forever() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("lib-1.0.jar");
    std::fs::write(&file, b"jar").unwrap();

    let check = artifact_check(&file, UpdatePolicy::Never);
    UpdateCheckManager::default()
        .with_clock(fixed_clock)
        .touch(&check, None);

    let later = UpdateCheckManager::default().with_clock(later_clock);
    let result = later.check(&check);
    assert!(!result.required);
    assert!(result.error.is_none());
}

#[test]
fn always_policy_refetches_immediately() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("lib-1.0.jar");
    std::fs::write(&file, b"jar").unwrap();

    let manager = UpdateCheckManager::default().with_clock(fixed_clock);
    let check = artifact_check(&file, UpdatePolicy::Always);
    manager.touch(&check, None);
    assert!(manager.check(&check).required);
}

#[test]
fn missing_file_without_record_is_required() {
    let tmp = tempfile::tempdir().unwrap();
    let check = artifact_check(&tmp.path().join("lib-1.0.jar"), UpdatePolicy::Daily);
    let result = UpdateCheckManager::default().with_clock(fixed_clock).check(&check);
    assert!(result.required);
    assert!(result.error.is_none());
}

#[test]
fn not_found_is_replayed_within_policy_window() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("lib-1.0.jar");
    let manager = UpdateCheckManager::new(true, false).with_clock(fixed_clock);
    let check = artifact_check(&file, UpdatePolicy::Daily);

    manager.touch(&check, Some(&not_found()));
    assert!(tmp.path().join("lib-1.0.jar.lastUpdated").is_file());

    let result = manager.check(&check);
    assert!(!result.required);
    let error = result.error.expect("replayed error");
    assert!(error.is_not_found());
    assert!(error.is_cached());
}

#[test]
fn not_found_is_retried_once_the_window_elapsed() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("lib-1.0.jar");
    let check = artifact_check(&file, UpdatePolicy::Daily);
    UpdateCheckManager::new(true, false)
        .with_clock(fixed_clock)
        .touch(&check, Some(&not_found()));

    let result = UpdateCheckManager::new(true, false)
        .with_clock(later_clock)
        .check(&check);
    assert!(result.required);
}

#[test]
fn not_found_caching_can_be_disabled() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = UpdateCheckManager::new(false, false).with_clock(fixed_clock);
    let check = artifact_check(&tmp.path().join("lib-1.0.jar"), UpdatePolicy::Never);
    manager.touch(&check, Some(&not_found()));
    assert!(manager.check(&check).required);
}

#[test]
fn transfer_errors_are_cached_only_when_enabled() {
    let tmp = tempfile::tempdir().unwrap();
    let check = artifact_check(&tmp.path().join("lib-1.0.jar"), UpdatePolicy::Never);
    let error = TransferError::Transfer {
        item: "org.example:lib:jar:1.0".into(),
        repository: "central".into(),
        url: "u".into(),
        message: "connection reset".into(),
        cached: false,
    };

    let uncached = UpdateCheckManager::new(true, false).with_clock(fixed_clock);
    uncached.touch(&check, Some(&error));
    assert!(uncached.check(&check).required);

    let cached = UpdateCheckManager::new(true, true).with_clock(fixed_clock);
    let result = cached.check(&check);
    assert!(!result.required);
    match result.error {
        Some(TransferError::Transfer { message, cached, .. }) => {
            assert_eq!(message, "connection reset");
            assert!(cached);
        }
        other => panic!("unexpected replay: {other:?}"),
    }
}

#[test]
fn success_clears_recorded_error() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("lib-1.0.jar");
    let manager = UpdateCheckManager::new(true, false).with_clock(fixed_clock);
    let check = artifact_check(&file, UpdatePolicy::Never);

    manager.touch(&check, Some(&not_found()));
    std::fs::write(&file, b"jar").unwrap();
    manager.touch(&check, None);

    let result = manager.check(&check);
    assert!(!result.required);
    assert!(result.error.is_none());
}

#[test]
fn metadata_is_tracked_per_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let file = tmp.path().join("maven-metadata-central.xml");
    let manager = UpdateCheckManager::new(true, false).with_clock(fixed_clock);
    let check = UpdateCheck {
        item: UpdateItem::Metadata(Metadata::versions("org.example", "lib", Nature::Release)),
        file: file.clone(),
        repository: central(),
        policy: UpdatePolicy::Daily,
        local_last_updated: 0,
    };

    manager.touch(&check, Some(&not_found()));
    let status = std::fs::read_to_string(tmp.path().join(METADATA_STATUS_FILE)).unwrap();
    assert!(status.contains("maven-metadata-central.xml/https___repo.example.com_maven2.error"));
    assert!(!manager.check(&check).required);
}
