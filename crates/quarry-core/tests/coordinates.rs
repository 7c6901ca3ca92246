use std::collections::HashSet;
use std::path::PathBuf;

use quarry_core::artifact::{base_version, Artifact};
use quarry_core::version::{Version, VersionConstraint};

#[test]
fn base_version_is_idempotent() {
    for v in [
        "1.0",
        "1.0-SNAPSHOT",
        "1.0-20100419.164221-46",
        "20100419.164221-1",
        "2.1-alpha-20240101.000000-3",
        "",
        "SNAPSHOT",
    ] {
        let once = base_version(v);
        assert_eq!(base_version(&once), once, "not idempotent for {v:?}");
    }
}

#[test]
fn equality_and_hash_agree() {
    let a = Artifact::parse("g:a:jar:1.0").unwrap();
    let b = Artifact::new("g", "a", "", "jar", "1.0");
    assert_eq!(a, b);
    let set: HashSet<Artifact> = [a.clone(), b].into_iter().collect();
    assert_eq!(set.len(), 1);

    // The file is part of the value.
    let with_file = a.with_file(Some(PathBuf::from("/tmp/a.jar")));
    assert_ne!(a, with_file);
    assert_eq!(a.key(), with_file.key());
}

#[test]
fn half_open_range_containment() {
    let c = VersionConstraint::parse("[1.0,2.0)").unwrap();
    assert!(c.contains_version(&Version::parse("1.5")));
    assert!(!c.contains_version(&Version::parse("2.0")));
    assert!(!c.contains_version(&Version::parse("0.9")));
    assert!(c.contains_version(&Version::parse("1.0")));
}

#[test]
fn pinned_version_constraint() {
    let c = VersionConstraint::parse("1.2").unwrap();
    assert!(!c.is_range());
    assert!(c.contains_version(&Version::parse("1.2")));
    assert!(!c.contains_version(&Version::parse("1.3")));
}

#[test]
fn union_of_ranges() {
    let c = VersionConstraint::parse("[1,2),[3,4]").unwrap();
    assert_eq!(c.ranges.len(), 2);
    assert!(c.contains_version(&Version::parse("1.5")));
    assert!(!c.contains_version(&Version::parse("2.5")));
    assert!(c.contains_version(&Version::parse("4")));
    assert_eq!(c.to_string(), "[1,2),[3,4]");
}

#[test]
fn malformed_ranges_are_errors() {
    for spec in ["[1.0,2.0", "[2.0,1.0]", "(1.0)", "[1,2,3]", "[1.0,2.0)x", "1.0]"] {
        assert!(VersionConstraint::parse(spec).is_err(), "{spec} should fail");
    }
}

#[test]
fn ordering_is_total_on_sample() {
    let mut versions: Vec<Version> = ["1.0", "1.0-alpha", "1.0-SNAPSHOT", "1.0-rc", "1.0.1", "0.9", "1.0-sp"]
        .iter()
        .map(|s| Version::parse(s))
        .collect();
    versions.sort();
    let sorted: Vec<&str> = versions.iter().map(Version::as_str).collect();
    assert_eq!(
        sorted,
        ["0.9", "1.0-alpha", "1.0-rc", "1.0-SNAPSHOT", "1.0", "1.0-sp", "1.0.1"]
    );
}
