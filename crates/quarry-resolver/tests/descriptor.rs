mod common;

use common::{artifact, dependencies, dependency_xml, system, Fixture};
use quarry_core::repository::RemoteRepository;
use quarry_resolver::descriptor::ArtifactDescriptorRequest;
use quarry_resolver::ResolverError;

fn relocation(coords: &str) -> String {
    let mut parts = coords.split(':');
    let g = parts.next().unwrap_or_default();
    let a = parts.next().unwrap_or_default();
    format!(
        "<distributionManagement><relocation><groupId>{g}</groupId>\
         <artifactId>{a}</artifactId></relocation></distributionManagement>"
    )
}

#[tokio::test]
async fn reads_dependencies_and_management() {
    let fixture = Fixture::new();
    fixture.pom(
        "org.example:app:1.0",
        &format!(
            "{}<dependencyManagement><dependencies>{}</dependencies></dependencyManagement>",
            dependencies(&["org.example:lib:2.0"]),
            dependency_xml("org.example:util:3.0", "<scope>runtime</scope>"),
        ),
    );
    let session = fixture.session().build();
    let request = ArtifactDescriptorRequest::new(artifact("org.example:app:1.0"), vec![fixture.repository()]);

    let result = system().read_artifact_descriptor(&session, &request).await.unwrap();
    assert!(result.relocations.is_empty());
    assert_eq!(result.dependencies.len(), 1);
    assert_eq!(result.dependencies[0].artifact.to_string(), "org.example:lib:jar:2.0");
    assert_eq!(result.dependencies[0].scope, "compile");
    assert_eq!(result.managed_dependencies.len(), 1);
    assert_eq!(result.managed_dependencies[0].scope, "runtime");
}

#[tokio::test]
async fn follows_relocations() {
    let fixture = Fixture::new();
    fixture.pom("org.old:lib:1.0", &relocation("org.new:lib"));
    fixture.pom("org.new:lib:1.0", &dependencies(&["org.example:dep:1.0"]));
    let session = fixture.session().build();
    let request = ArtifactDescriptorRequest::new(artifact("org.old:lib:1.0"), vec![fixture.repository()]);

    let result = system().read_artifact_descriptor(&session, &request).await.unwrap();
    assert_eq!(result.artifact.group_id, "org.new");
    assert_eq!(result.relocations.len(), 1);
    assert_eq!(result.relocations[0].group_id, "org.old");
    assert_eq!(result.dependencies.len(), 1);
}

#[tokio::test]
async fn relocation_cycles_are_rejected() {
    let fixture = Fixture::new();
    fixture.pom("org.a:lib:1.0", &relocation("org.b:lib"));
    fixture.pom("org.b:lib:1.0", &relocation("org.a:lib"));
    let session = fixture
        .session()
        .ignore_invalid_descriptors(true)
        .ignore_missing_descriptors(true)
        .build();
    let request = ArtifactDescriptorRequest::new(artifact("org.a:lib:1.0"), vec![fixture.repository()]);

    let err = system().read_artifact_descriptor(&session, &request).await.unwrap_err();
    match err {
        ResolverError::RelocationCycle { chain } => {
            assert_eq!(chain, ["org.a:lib:1.0", "org.b:lib:1.0", "org.a:lib:1.0"]);
        }
        other => panic!("expected a relocation cycle, got {other}"),
    }
}

#[tokio::test]
async fn parents_and_imports_are_folded_in() {
    let fixture = Fixture::new();
    fixture.pom(
        "org.example:parent:1",
        &format!(
            "<properties><lib.version>2.5</lib.version></properties>{}",
            dependencies(&["org.example:inherited:1.0"])
        ),
    );
    fixture.pom(
        "org.example:bom:1",
        &format!(
            "<dependencyManagement><dependencies>{}</dependencies></dependencyManagement>",
            dependency_xml("org.example:managed:4.0", "")
        ),
    );
    fixture.pom(
        "org.example:child:1.0",
        &format!(
            "<parent><groupId>org.example</groupId><artifactId>parent</artifactId><version>1</version></parent>\
             <dependencyManagement><dependencies>{}</dependencies></dependencyManagement>{}",
            dependency_xml("org.example:bom:1", "<type>pom</type><scope>import</scope>"),
            dependencies(&["org.example:lib:${lib.version}"]),
        ),
    );
    let session = fixture.session().build();
    let request = ArtifactDescriptorRequest::new(artifact("org.example:child:1.0"), vec![fixture.repository()]);

    let result = system().read_artifact_descriptor(&session, &request).await.unwrap();
    let deps: Vec<String> = result.dependencies.iter().map(|d| d.artifact.to_string()).collect();
    assert!(deps.contains(&"org.example:lib:jar:2.5".to_string()), "{deps:?}");
    assert!(deps.contains(&"org.example:inherited:jar:1.0".to_string()), "{deps:?}");
    assert!(result
        .managed_dependencies
        .iter()
        .any(|d| d.artifact.artifact_id == "managed" && d.artifact.version == "4.0"));
    assert!(!result
        .managed_dependencies
        .iter()
        .any(|d| d.artifact.artifact_id == "bom"));
}

#[tokio::test]
async fn missing_descriptors_fail_unless_tolerated() {
    let fixture = Fixture::new();
    let request = ArtifactDescriptorRequest::new(artifact("org.example:ghost:1.0"), vec![fixture.repository()]);

    let strict = fixture.session().build();
    let err = system().read_artifact_descriptor(&strict, &request).await.unwrap_err();
    assert!(matches!(err, ResolverError::Descriptor { .. }));

    let tolerant = fixture.session().ignore_missing_descriptors(true).build();
    let result = system().read_artifact_descriptor(&tolerant, &request).await.unwrap();
    assert!(result.dependencies.is_empty());
}

#[tokio::test]
async fn invalid_descriptors_fail_unless_tolerated() {
    let fixture = Fixture::new();
    fixture.write("org/example/broken/1.0/broken-1.0.pom", "<html><body>not a POM</body></html>");
    let request = ArtifactDescriptorRequest::new(artifact("org.example:broken:1.0"), vec![fixture.repository()]);

    let strict = fixture.session().ignore_missing_descriptors(true).build();
    let err = system().read_artifact_descriptor(&strict, &request).await.unwrap_err();
    assert!(matches!(err, ResolverError::Descriptor { .. }));

    let tolerant = fixture.session().ignore_invalid_descriptors(true).build();
    let result = system().read_artifact_descriptor(&tolerant, &request).await.unwrap();
    assert!(result.dependencies.is_empty());
}

#[tokio::test]
async fn invalid_tolerance_does_not_cover_missing_descriptors() {
    let fixture = Fixture::new();
    let request = ArtifactDescriptorRequest::new(artifact("org.example:ghost:1.0"), vec![fixture.repository()]);
    let session = fixture
        .session()
        .ignore_missing_descriptors(false)
        .ignore_invalid_descriptors(true)
        .build();

    let err = system().read_artifact_descriptor(&session, &request).await.unwrap_err();
    assert!(matches!(err, ResolverError::Descriptor { .. }), "{err}");
}

#[tokio::test]
async fn missing_parents_make_the_descriptor_invalid() {
    let fixture = Fixture::new();
    fixture.pom(
        "org.example:orphan:1.0",
        "<parent><groupId>org.example</groupId><artifactId>gone</artifactId><version>1</version></parent>",
    );
    let request = ArtifactDescriptorRequest::new(artifact("org.example:orphan:1.0"), vec![fixture.repository()]);

    let missing_only = fixture.session().ignore_missing_descriptors(true).build();
    let err = system().read_artifact_descriptor(&missing_only, &request).await.unwrap_err();
    assert!(err.to_string().contains("org.example:orphan:jar:1.0"), "{err}");

    let invalid_only = fixture.session().ignore_invalid_descriptors(true).build();
    let result = system().read_artifact_descriptor(&invalid_only, &request).await.unwrap();
    assert!(result.dependencies.is_empty());
}

#[tokio::test]
async fn unreachable_repositories_are_never_tolerated() {
    let fixture = Fixture::new();
    let request = ArtifactDescriptorRequest::new(
        artifact("org.example:lib:1.0"),
        vec![RemoteRepository::new("legacy", "ftp://repo.example.com/maven")],
    );
    let session = fixture
        .session()
        .ignore_missing_descriptors(true)
        .ignore_invalid_descriptors(true)
        .build();

    let err = system().read_artifact_descriptor(&session, &request).await.unwrap_err();
    assert!(matches!(err, ResolverError::Descriptor { .. }), "{err}");
}
