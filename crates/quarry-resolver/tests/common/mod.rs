#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use quarry_core::artifact::Artifact;
use quarry_core::dependency::Dependency;
use quarry_core::repository::{LocalRepository, RemoteRepository};
use quarry_maven::connector::DefaultConnectorProvider;
use quarry_resolver::{RepositorySystem, SessionBuilder};
use tempfile::TempDir;

/// A `file://` remote repository and an empty local repository.
pub struct Fixture {
    pub remote: TempDir,
    pub local: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            remote: tempfile::tempdir().unwrap(),
            local: tempfile::tempdir().unwrap(),
        }
    }

    pub fn repository(&self) -> RemoteRepository {
        repository_at("fixture", self.remote.path())
    }

    pub fn session(&self) -> SessionBuilder {
        SessionBuilder::new(LocalRepository::new(self.local.path()))
    }

    pub fn write(&self, relative: &str, content: &str) {
        write(&self.remote.path().join(relative), content);
    }

    /// Publish a POM for `g:a:v`; `body` goes inside `<project>`.
    pub fn pom(&self, coords: &str, body: &str) {
        let (g, a, v) = split(coords);
        let xml = format!(
            "<project>\n  <modelVersion>4.0.0</modelVersion>\n  <groupId>{g}</groupId>\n  \
             <artifactId>{a}</artifactId>\n  <version>{v}</version>\n{body}\n</project>\n"
        );
        self.write(&format!("{}/{a}/{v}/{a}-{v}.pom", g.replace('.', "/")), &xml);
    }

    /// Publish a jar and an empty POM for `g:a:v`.
    pub fn jar(&self, coords: &str) {
        let (g, a, v) = split(coords);
        self.write(
            &format!("{}/{a}/{v}/{a}-{v}.jar", g.replace('.', "/")),
            &format!("jar of {coords}"),
        );
    }

    /// Publish `maven-metadata.xml` listing `versions` for `g:a`.
    pub fn versions(&self, ga: &str, versions: &[&str], last_updated: &str) {
        self.write_versions(ga, versions, versions.last().copied(), last_updated);
    }

    pub fn write_versions(&self, ga: &str, versions: &[&str], release: Option<&str>, last_updated: &str) {
        let (g, a) = ga.split_once(':').unwrap();
        let listed: String = versions
            .iter()
            .map(|v| format!("<version>{v}</version>"))
            .collect();
        let release = release
            .map(|r| format!("<latest>{r}</latest><release>{r}</release>"))
            .unwrap_or_default();
        self.write(
            &format!("{}/{a}/maven-metadata.xml", g.replace('.', "/")),
            &format!(
                "<metadata><groupId>{g}</groupId><artifactId>{a}</artifactId><versioning>\
                 {release}<versions>{listed}</versions><lastUpdated>{last_updated}</lastUpdated>\
                 </versioning></metadata>"
            ),
        );
    }
}

pub fn repository_at(id: &str, dir: &Path) -> RemoteRepository {
    RemoteRepository::new(id, format!("file://{}", dir.display()))
}

pub fn system() -> RepositorySystem {
    RepositorySystem::new(Arc::new(DefaultConnectorProvider::new().unwrap()))
}

pub fn artifact(coords: &str) -> Artifact {
    Artifact::parse(coords).unwrap()
}

pub fn dependency(coords: &str) -> Dependency {
    Dependency::new(artifact(coords), "compile")
}

/// `<dependencies>` block declaring compile dependencies on `coords`.
pub fn dependencies(coords: &[&str]) -> String {
    let entries: String = coords.iter().map(|c| dependency_xml(c, "")).collect();
    format!("<dependencies>{entries}</dependencies>")
}

pub fn dependency_xml(coords: &str, extra: &str) -> String {
    let (g, a, v) = split(coords);
    format!("<dependency><groupId>{g}</groupId><artifactId>{a}</artifactId><version>{v}</version>{extra}</dependency>")
}

fn split(coords: &str) -> (&str, &str, &str) {
    let mut parts = coords.splitn(3, ':');
    let g = parts.next().unwrap();
    let a = parts.next().unwrap();
    let v = parts.next().unwrap();
    (g, a, v)
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}
