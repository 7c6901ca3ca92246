use quarry_core::artifact::Artifact;
use quarry_core::dependency::{merge_dependencies, scope, Dependency, Exclusion};

fn dep(coords: &str) -> Dependency {
    Dependency::new(Artifact::parse(coords).unwrap(), scope::COMPILE)
}

#[test]
fn exclusion_wildcards_match_any_field() {
    let excl = Exclusion::of("commons-logging", "*");
    assert!(excl.matches(&Artifact::parse("commons-logging:commons-logging:1.2").unwrap()));
    assert!(excl.matches(&Artifact::parse("commons-logging:other:pom:1.0").unwrap()));
    assert!(!excl.matches(&Artifact::parse("org.slf4j:slf4j-api:2.0").unwrap()));
}

#[test]
fn exclusion_exact_fields() {
    let excl = Exclusion::new("g", "a", "tests", "jar");
    assert!(excl.matches(&Artifact::new("g", "a", "tests", "jar", "1.0")));
    assert!(!excl.matches(&Artifact::new("g", "a", "", "jar", "1.0")));
}

#[test]
fn exclusion_parse_fills_wildcards() {
    let excl = Exclusion::parse("g:a").unwrap();
    assert_eq!(excl.classifier, "*");
    assert_eq!(excl.extension, "*");
    assert!(Exclusion::parse("g").is_none());
}

#[test]
fn management_key_ignores_version() {
    assert_eq!(dep("g:a:1.0").management_key(), dep("g:a:2.0").management_key());
    assert_ne!(
        dep("g:a:1.0").management_key(),
        dep("g:a:pom:1.0").management_key()
    );
}

#[test]
fn optional_defaults_to_false() {
    let d = dep("g:a:1.0");
    assert!(!d.is_optional());
    assert!(d.with_optional(Some(true)).is_optional());
}

#[test]
fn merge_prefers_dominant_entries() {
    let dominant = vec![dep("g:a:2.0")];
    let recessive = vec![dep("g:a:1.0"), dep("g:b:1.0")];
    let merged = merge_dependencies(&dominant, &recessive);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].artifact.version, "2.0");
    assert_eq!(merged[1].artifact.artifact_id, "b");
}

#[test]
fn display_marks_optional() {
    let d = dep("g:a:1.0").with_optional(Some(true));
    assert_eq!(d.to_string(), "g:a:jar:1.0 (compile?)");
}
