mod common;

use common::{artifact, repository_at, system, Fixture};
use quarry_core::repository::ArtifactRepository;
use quarry_resolver::range_resolver::VersionRangeRequest;
use quarry_resolver::version_resolver::VersionRequest;
use quarry_resolver::ResolverError;

#[tokio::test]
async fn literal_versions_pass_through() {
    let fixture = Fixture::new();
    let session = fixture.session().build();
    let request = VersionRequest::new(artifact("org.example:lib:1.0"), vec![fixture.repository()]);

    let result = system().resolve_version(&session, &request).await.unwrap();
    assert_eq!(result.version, "1.0");
    assert!(result.repository.is_none());
}

#[tokio::test]
async fn release_and_latest_come_from_metadata() {
    let fixture = Fixture::new();
    fixture.versions("org.example:lib", &["1.0", "1.1", "2.0"], "20240101000000");
    let session = fixture.session().build();
    let system = system();

    for meta in ["RELEASE", "LATEST"] {
        let request = VersionRequest::new(
            artifact(&format!("org.example:lib:{meta}")),
            vec![fixture.repository()],
        );
        let result = system.resolve_version(&session, &request).await.unwrap();
        assert_eq!(result.version, "2.0", "{meta}");
        assert!(matches!(
            result.repository,
            Some(ArtifactRepository::Remote(ref r)) if r.id == "fixture"
        ));
    }
}

#[tokio::test]
async fn most_recently_updated_repository_wins() {
    let stale = Fixture::new();
    stale.versions("org.example:lib", &["1.0", "3.0"], "20200101000000");
    let fresh = tempfile::tempdir().unwrap();
    let fresh_repo = repository_at("fresh", fresh.path());
    let publish = Fixture {
        remote: fresh,
        local: tempfile::tempdir().unwrap(),
    };
    publish.versions("org.example:lib", &["1.0", "2.0"], "20240101000000");

    let session = stale.session().build();
    let request = VersionRequest::new(
        artifact("org.example:lib:RELEASE"),
        vec![stale.repository(), fresh_repo],
    );
    let result = system().resolve_version(&session, &request).await.unwrap();
    assert_eq!(result.version, "2.0");
    assert!(matches!(
        result.repository,
        Some(ArtifactRepository::Remote(ref r)) if r.id == "fresh"
    ));
}

#[tokio::test]
async fn snapshots_resolve_to_timestamped_versions() {
    let fixture = Fixture::new();
    fixture.write(
        "org/example/snap/1.0-SNAPSHOT/maven-metadata.xml",
        "<metadata><groupId>org.example</groupId><artifactId>snap</artifactId>\
         <version>1.0-SNAPSHOT</version><versioning>\
         <snapshot><timestamp>20240101.120000</timestamp><buildNumber>3</buildNumber></snapshot>\
         <lastUpdated>20240101120000</lastUpdated>\
         <snapshotVersions><snapshotVersion><extension>jar</extension>\
         <value>1.0-20240101.120000-3</value><updated>20240101120000</updated>\
         </snapshotVersion></snapshotVersions></versioning></metadata>",
    );
    let session = fixture.session().build();
    let request = VersionRequest::new(
        artifact("org.example:snap:1.0-SNAPSHOT"),
        vec![fixture.repository()],
    );

    let result = system().resolve_version(&session, &request).await.unwrap();
    assert_eq!(result.version, "1.0-20240101.120000-3");
}

#[tokio::test]
async fn snapshots_without_metadata_stay_literal() {
    let fixture = Fixture::new();
    let session = fixture.session().build();
    let request = VersionRequest::new(
        artifact("org.example:snap:1.0-SNAPSHOT"),
        vec![fixture.repository()],
    );
    let result = system().resolve_version(&session, &request).await.unwrap();
    assert_eq!(result.version, "1.0-SNAPSHOT");
    assert!(result.repository.is_none());
}

#[tokio::test]
async fn release_without_metadata_fails() {
    let fixture = Fixture::new();
    let session = fixture.session().build();
    let request = VersionRequest::new(
        artifact("org.example:lib:RELEASE"),
        vec![fixture.repository()],
    );
    let err = system().resolve_version(&session, &request).await.unwrap_err();
    assert!(matches!(err, ResolverError::VersionResolution { .. }));
}

#[tokio::test]
async fn ranges_expand_in_ascending_order() {
    let fixture = Fixture::new();
    fixture.versions("org.example:lib", &["1.0", "2.0", "1.5", "3.0"], "20240101000000");
    let session = fixture.session().build();
    let request = VersionRangeRequest::new(
        artifact("org.example:lib:[1.0,3.0]"),
        vec![fixture.repository()],
    );

    let result = system().resolve_version_range(&session, &request).await.unwrap();
    let versions: Vec<&str> = result.versions.iter().map(|v| v.as_str()).collect();
    assert_eq!(versions, ["1.0", "1.5", "2.0", "3.0"]);
    assert_eq!(result.highest().map(|v| v.as_str()), Some("3.0"));
    assert!(result
        .versions
        .iter()
        .all(|v| matches!(result.repository(v), Some(ArtifactRepository::Remote(_)))));
}

#[tokio::test]
async fn half_open_ranges_exclude_the_upper_bound() {
    let fixture = Fixture::new();
    fixture.versions("org.example:lib", &["1.0", "1.1", "2.0"], "20240101000000");
    let session = fixture.session().build();
    let request = VersionRangeRequest::new(
        artifact("org.example:lib:[1.0,2.0)"),
        vec![fixture.repository()],
    );
    let result = system().resolve_version_range(&session, &request).await.unwrap();
    let versions: Vec<&str> = result.versions.iter().map(|v| v.as_str()).collect();
    assert_eq!(versions, ["1.0", "1.1"]);
}

#[tokio::test]
async fn ranges_matching_nothing_are_empty() {
    let fixture = Fixture::new();
    fixture.versions("org.example:lib", &["1.0"], "20240101000000");
    let session = fixture.session().build();
    let request = VersionRangeRequest::new(
        artifact("org.example:lib:[3.0,)"),
        vec![fixture.repository()],
    );
    let result = system().resolve_version_range(&session, &request).await.unwrap();
    assert!(result.versions.is_empty());
}

#[tokio::test]
async fn malformed_ranges_fail() {
    let fixture = Fixture::new();
    let session = fixture.session().build();
    let request = VersionRangeRequest::new(
        artifact("org.example:lib:[1.0"),
        vec![fixture.repository()],
    );
    let err = system().resolve_version_range(&session, &request).await.unwrap_err();
    assert!(matches!(err, ResolverError::VersionRangeResolution { .. }));
}
