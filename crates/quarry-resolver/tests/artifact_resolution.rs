mod common;

use common::{artifact, dependencies, dependency, system, Fixture};
use quarry_core::repository::{ArtifactRepository, RemoteRepository, UpdatePolicy};
use quarry_maven::transfer::TransferError;
use quarry_resolver::artifact_resolver::ArtifactRequest;
use quarry_resolver::collector::CollectRequest;
use quarry_resolver::ResolverError;

fn first_transfer_error(error: &ResolverError) -> Option<&TransferError> {
    let ResolverError::ArtifactResolution { results } = error else {
        return None;
    };
    results
        .iter()
        .flat_map(|r| r.errors.iter())
        .find_map(|e| match e {
            ResolverError::Transfer(t) => Some(t),
            _ => None,
        })
}

#[tokio::test]
async fn downloads_into_the_local_repository() {
    let fixture = Fixture::new();
    fixture.jar("org.example:lib:1.0");
    let session = fixture.session().build();
    let request = ArtifactRequest::new(artifact("org.example:lib:1.0"), vec![fixture.repository()]);

    let result = system().resolve_artifact(&session, request).await.unwrap();
    assert!(result.is_resolved());
    let file = result.artifact.as_ref().and_then(|a| a.file()).unwrap();
    assert!(file.starts_with(fixture.local.path()));
    assert_eq!(std::fs::read_to_string(file).unwrap(), "jar of org.example:lib:1.0");
    assert!(matches!(
        result.repository,
        Some(ArtifactRepository::Remote(ref r)) if r.id == "fixture"
    ));
}

#[tokio::test]
async fn partial_failures_keep_resolved_artifacts() {
    let fixture = Fixture::new();
    fixture.jar("org.example:present:1.0");
    let session = fixture.session().build();
    let requests = vec![
        ArtifactRequest::new(artifact("org.example:present:1.0"), vec![fixture.repository()]),
        ArtifactRequest::new(artifact("org.example:absent:1.0"), vec![fixture.repository()]),
    ];

    let err = system().resolve_artifacts(&session, requests).await.unwrap_err();
    assert!(err.is_not_found());
    let ResolverError::ArtifactResolution { results } = &err else {
        panic!("unexpected error {err}");
    };
    assert_eq!(results.len(), 2);
    assert!(results[0].is_resolved());
    assert!(!results[1].is_resolved());
    assert!(!results[1].errors.is_empty());
    assert!(err.to_string().contains("org.example:absent:jar:1.0"));
}

#[tokio::test]
async fn offline_sessions_only_use_cached_files() {
    let fixture = Fixture::new();
    fixture.jar("org.example:lib:1.0");
    let request = ArtifactRequest::new(artifact("org.example:lib:1.0"), vec![fixture.repository()]);
    let system = system();

    let offline = fixture.session().offline(true).build();
    let err = system.resolve_artifact(&offline, request.clone()).await.unwrap_err();
    assert!(matches!(
        first_transfer_error(&err),
        Some(TransferError::Offline { repository, .. }) if repository == "fixture"
    ));

    let online = fixture.session().build();
    system.resolve_artifact(&online, request.clone()).await.unwrap();
    let cached = system.resolve_artifact(&offline, request).await.unwrap();
    assert!(cached.is_resolved());
}

#[tokio::test]
async fn missing_artifacts_are_not_retried_within_the_update_interval() {
    let fixture = Fixture::new();
    let request = ArtifactRequest::new(artifact("org.example:late:1.0"), vec![fixture.repository()]);
    let system = system();

    let session = fixture.session().build();
    let err = system.resolve_artifact(&session, request.clone()).await.unwrap_err();
    assert!(first_transfer_error(&err).is_some_and(|e| e.is_not_found() && !e.is_cached()));

    fixture.jar("org.example:late:1.0");
    let err = system.resolve_artifact(&session, request.clone()).await.unwrap_err();
    assert!(first_transfer_error(&err).is_some_and(|e| e.is_not_found() && e.is_cached()));

    let eager = fixture.session().update_policy(Some(UpdatePolicy::Always)).build();
    let result = system.resolve_artifact(&eager, request).await.unwrap();
    assert!(result.is_resolved());
}

#[tokio::test]
async fn unsupported_repositories_fail_per_artifact() {
    let fixture = Fixture::new();
    let session = fixture.session().build();
    let request = ArtifactRequest::new(
        artifact("org.example:lib:1.0"),
        vec![RemoteRepository::new("legacy", "ftp://repo.example.com/maven")],
    );
    let err = system().resolve_artifact(&session, request).await.unwrap_err();
    let ResolverError::ArtifactResolution { results } = &err else {
        panic!("unexpected error {err}");
    };
    assert!(matches!(results[0].errors[0], ResolverError::NoConnector(_)));
}

#[tokio::test]
async fn resolving_dependencies_attaches_files_to_the_graph() {
    let fixture = Fixture::new();
    fixture.pom("org.example:app:1.0", &dependencies(&["org.example:lib:1.0"]));
    fixture.pom("org.example:lib:1.0", "");
    fixture.jar("org.example:app:1.0");
    fixture.jar("org.example:lib:1.0");
    let session = fixture.session().build();
    let request = CollectRequest::for_root(dependency("org.example:app:1.0"), vec![fixture.repository()]);

    let result = system().resolve_dependencies(&session, request).await.unwrap();
    assert_eq!(result.artifact_results.len(), 2);
    for id in result.graph.nodes() {
        let node = result.graph.node(id);
        let artifact = node.artifact().unwrap();
        assert!(artifact.file().is_some_and(|f| f.is_file()), "{artifact}");
    }
}
