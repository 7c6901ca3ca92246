//! Maven 2 repository layout: relative paths and URLs of artifacts, metadata
//! and checksum sidecars.

use quarry_core::artifact::Artifact;
use quarry_core::metadata::Metadata;
use quarry_core::repository::RemoteRepository;
use quarry_util::hash::ChecksumAlgorithm;

/// Directory of a coordinate: `org.jetbrains.kotlinx:kotlinx-coroutines-core:1.8.0`
/// becomes `org/jetbrains/kotlinx/kotlinx-coroutines-core/1.8.0`.
pub fn coordinate_path(group: &str, artifact: &str, version: &str) -> String {
    format!("{}/{}/{}", group.replace('.', "/"), artifact, version)
}

/// File name of an artifact: `artifactId-version[-classifier][.extension]`.
pub fn artifact_file_name(artifact: &Artifact) -> String {
    let mut name = format!("{}-{}", artifact.artifact_id, artifact.version);
    if !artifact.classifier.is_empty() {
        name.push('-');
        name.push_str(&artifact.classifier);
    }
    if !artifact.extension.is_empty() {
        name.push('.');
        name.push_str(&artifact.extension);
    }
    name
}

/// Repository-relative path of an artifact.
///
/// Timestamped snapshots live in their base version directory:
/// `g/a/1.0-SNAPSHOT/a-1.0-20240101.120000-5.jar`.
pub fn artifact_path(artifact: &Artifact) -> String {
    format!(
        "{}/{}",
        coordinate_path(
            &artifact.group_id,
            &artifact.artifact_id,
            &artifact.base_version()
        ),
        artifact_file_name(artifact)
    )
}

/// Repository-relative path of a metadata file.
pub fn metadata_path(metadata: &Metadata) -> String {
    let mut path = String::new();
    if !metadata.group_id.is_empty() {
        path.push_str(&metadata.group_id.replace('.', "/"));
        path.push('/');
        if !metadata.artifact_id.is_empty() {
            path.push_str(&metadata.artifact_id);
            path.push('/');
            if !metadata.version.is_empty() {
                path.push_str(&metadata.version);
                path.push('/');
            }
        }
    }
    path.push_str(&metadata.type_);
    path
}

/// Path of the checksum sidecar for `path`.
pub fn checksum_path(path: &str, algorithm: ChecksumAlgorithm) -> String {
    format!("{path}.{}", algorithm.extension())
}

/// Absolute URL of a repository-relative path.
pub fn url(repository: &RemoteRepository, path: &str) -> String {
    format!("{}/{}", repository.url, path)
}
