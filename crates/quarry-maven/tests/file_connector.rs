use std::path::Path;

use quarry_core::artifact::Artifact;
use quarry_core::metadata::{Metadata, Nature};
use quarry_core::repository::{ChecksumPolicy, RemoteRepository};
use quarry_maven::connector::{
    ArtifactDownload, ArtifactUpload, DefaultConnectorProvider, MetadataDownload,
    RepositoryConnectorProvider,
};
use quarry_util::hash::ChecksumAlgorithm;

fn file_repo(dir: &Path) -> RemoteRepository {
    RemoteRepository::new("fs", format!("file://{}", dir.display()))
}

fn write(path: &Path, data: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

fn lib() -> Artifact {
    Artifact::new("org.example", "lib", "", "jar", "1.0")
}

#[tokio::test]
async fn downloads_artifacts_and_metadata() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let jar = remote.path().join("org/example/lib/1.0/lib-1.0.jar");
    write(&jar, b"jar bytes");
    write(
        &remote.path().join("org/example/lib/1.0/lib-1.0.jar.sha1"),
        ChecksumAlgorithm::Sha1.hex_bytes(b"jar bytes").as_bytes(),
    );
    write(
        &remote.path().join("org/example/lib/maven-metadata.xml"),
        b"<metadata><versioning><versions><version>1.0</version></versions></versioning></metadata>",
    );

    let provider = DefaultConnectorProvider::new().unwrap();
    let connector = provider.connector(&file_repo(remote.path())).unwrap();

    let dest = local.path().join("lib-1.0.jar");
    let meta_dest = local.path().join("maven-metadata-fs.xml");
    let mut artifacts = vec![ArtifactDownload::new(lib(), dest.clone(), ChecksumPolicy::Fail)];
    let mut metadata = vec![MetadataDownload::new(
        Metadata::versions("org.example", "lib", Nature::Release),
        meta_dest.clone(),
        ChecksumPolicy::Warn,
    )];
    connector.get(&mut artifacts, &mut metadata).await;

    assert!(artifacts[0].error.is_none());
    assert!(metadata[0].error.is_none());
    assert_eq!(std::fs::read(&dest).unwrap(), b"jar bytes");
    assert!(meta_dest.is_file());
}

#[tokio::test]
async fn missing_items_report_not_found() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    let connector = DefaultConnectorProvider::new()
        .unwrap()
        .connector(&file_repo(remote.path()))
        .unwrap();

    let mut artifacts = vec![ArtifactDownload::new(
        lib(),
        local.path().join("lib-1.0.jar"),
        ChecksumPolicy::Warn,
    )];
    connector.get(&mut artifacts, &mut []).await;

    let error = artifacts[0].error.as_ref().expect("not found");
    assert!(error.is_not_found());
    assert!(!error.is_cached());
}

#[tokio::test]
async fn checksum_mismatch_fails_under_fail_policy() {
    let remote = tempfile::tempdir().unwrap();
    let local = tempfile::tempdir().unwrap();
    write(&remote.path().join("org/example/lib/1.0/lib-1.0.jar"), b"tampered");
    write(
        &remote.path().join("org/example/lib/1.0/lib-1.0.jar.sha1"),
        ChecksumAlgorithm::Sha1.hex_bytes(b"original").as_bytes(),
    );
    let connector = DefaultConnectorProvider::new()
        .unwrap()
        .connector(&file_repo(remote.path()))
        .unwrap();

    let strict = local.path().join("strict.jar");
    let lenient = local.path().join("lenient.jar");
    let mut artifacts = vec![
        ArtifactDownload::new(lib(), strict.clone(), ChecksumPolicy::Fail),
        ArtifactDownload::new(lib(), lenient.clone(), ChecksumPolicy::Warn),
    ];
    connector.get(&mut artifacts, &mut []).await;

    assert!(matches!(
        artifacts[0].error,
        Some(quarry_maven::transfer::TransferError::Checksum { .. })
    ));
    assert!(!strict.exists());
    assert!(artifacts[1].error.is_none());
    assert!(lenient.is_file());
}

#[tokio::test]
async fn put_writes_file_and_sidecars() {
    let remote = tempfile::tempdir().unwrap();
    let staging = tempfile::tempdir().unwrap();
    let source = staging.path().join("lib.jar");
    std::fs::write(&source, b"built").unwrap();

    let connector = DefaultConnectorProvider::new()
        .unwrap()
        .connector(&file_repo(remote.path()))
        .unwrap();
    let mut uploads = vec![ArtifactUpload {
        artifact: lib(),
        file: source,
        error: None,
    }];
    connector.put(&mut uploads, &mut []).await;

    assert!(uploads[0].error.is_none());
    let base = remote.path().join("org/example/lib/1.0/lib-1.0.jar");
    assert_eq!(std::fs::read(&base).unwrap(), b"built");
    let sha1 = std::fs::read_to_string(remote.path().join("org/example/lib/1.0/lib-1.0.jar.sha1"))
        .unwrap();
    assert_eq!(sha1, ChecksumAlgorithm::Sha1.hex_bytes(b"built"));
}

#[test]
fn unsupported_repositories_have_no_connector() {
    let provider = DefaultConnectorProvider::new().unwrap();
    let ftp = RemoteRepository::new("ftp", "ftp://example.com/repo");
    assert!(provider.connector(&ftp).is_err());

    let mut legacy = RemoteRepository::new("legacy", "https://example.com/repo");
    legacy.content_type = "legacy".into();
    let err = provider.connector(&legacy).err().unwrap();
    assert_eq!(err.repository, "legacy");
}
