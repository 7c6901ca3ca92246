use quarry_util::fs::{ensure_dir, ensure_parent, modified_millis, now_millis};
use tempfile::TempDir;

#[test]
fn test_ensure_dir_creates_nested() {
    let tmp = TempDir::new().unwrap();
    let deep = tmp.path().join("x").join("y").join("z");
    assert!(!deep.exists());
    ensure_dir(&deep).unwrap();
    assert!(deep.is_dir());
}

#[test]
fn test_ensure_dir_idempotent() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("already");
    std::fs::create_dir(&dir).unwrap();
    ensure_dir(&dir).unwrap();
    assert!(dir.is_dir());
}

#[test]
fn test_ensure_parent_creates_directory_of_file() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("org").join("example").join("lib.jar");
    ensure_parent(&file).unwrap();
    assert!(tmp.path().join("org").join("example").is_dir());
    assert!(!file.exists());
}

#[test]
fn test_modified_millis_missing_file() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(modified_millis(&tmp.path().join("missing")), None);
}

#[test]
fn test_modified_millis_recent_file() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("f.txt");
    std::fs::write(&file, "x").unwrap();
    let modified = modified_millis(&file).unwrap();
    // Allow for coarse filesystem timestamp granularity.
    assert!(modified <= now_millis() + 2_000);
    assert!(modified > 0);
}
