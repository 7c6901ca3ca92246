//! POM file parsing: dependency declarations, repositories, relocation,
//! parent inheritance, property interpolation, BOM imports.

use std::collections::BTreeMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use quarry_core::artifact::{props, Artifact};
use quarry_core::dependency::{scope, Dependency, Exclusion};
use quarry_core::repository::{RemoteRepository, RepositoryPolicy, UpdatePolicy};
use quarry_util::errors::QuarryError;

/// A parsed POM (Project Object Model) file.
#[derive(Debug, Clone, Default)]
pub struct Pom {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub packaging: Option<String>,

    pub parent: Option<ParentRef>,
    pub properties: BTreeMap<String, String>,
    pub dependencies: Vec<PomDependency>,
    pub dependency_management: Vec<PomDependency>,
    pub repositories: Vec<PomRepository>,
    pub relocation: Option<Relocation>,
}

/// Reference to a parent POM.
#[derive(Debug, Clone)]
pub struct ParentRef {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub relative_path: Option<String>,
}

/// A dependency declared in a POM file.
#[derive(Debug, Clone, Default)]
pub struct PomDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: Option<bool>,
    pub classifier: Option<String>,
    pub type_: Option<String>,
    pub system_path: Option<String>,
    pub exclusions: Vec<PomExclusion>,
}

/// An exclusion within a dependency declaration.
#[derive(Debug, Clone)]
pub struct PomExclusion {
    pub group_id: String,
    pub artifact_id: Option<String>,
}

/// A `<repository>` declared by the POM.
#[derive(Debug, Clone, Default)]
pub struct PomRepository {
    pub id: String,
    pub url: String,
    pub layout: Option<String>,
    pub releases: Option<PomRepositoryPolicy>,
    pub snapshots: Option<PomRepositoryPolicy>,
}

#[derive(Debug, Clone, Default)]
pub struct PomRepositoryPolicy {
    pub enabled: Option<bool>,
    pub update_policy: Option<String>,
}

/// `distributionManagement/relocation`: the artifact moved. Missing fields
/// keep the value of the relocated artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relocation {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub message: Option<String>,
}

impl Pom {
    /// Effective group ID (falls back to parent).
    pub fn effective_group_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.group_id.as_str()))
    }

    /// Effective version (falls back to parent).
    pub fn effective_version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .or(self.parent.as_ref().map(|p| p.version.as_str()))
    }

    /// Resolve `${property}` references in a string using POM properties
    /// and built-in project variables.
    pub fn interpolate(&self, input: &str) -> String {
        let mut result = input.to_string();
        let mut iterations = 0;
        while result.contains("${") && iterations < 20 {
            iterations += 1;
            let mut new = result.clone();
            while let Some(start) = new.find("${") {
                let Some(end) = new[start..].find('}') else {
                    break;
                };
                let key = &new[start + 2..start + end];
                let value = self.resolve_property(key);
                if let Some(val) = value {
                    new = format!("{}{}{}", &new[..start], val, &new[start + end + 1..]);
                } else {
                    break;
                }
            }
            if new == result {
                break;
            }
            result = new;
        }
        result
    }

    fn resolve_property(&self, key: &str) -> Option<String> {
        match key {
            "project.groupId" | "pom.groupId" => self.effective_group_id().map(|s| s.to_string()),
            "project.artifactId" | "pom.artifactId" => self.artifact_id.clone(),
            "project.version" | "pom.version" => self.effective_version().map(|s| s.to_string()),
            "project.packaging" | "pom.packaging" => self.packaging.clone(),
            "project.parent.groupId" => self.parent.as_ref().map(|p| p.group_id.clone()),
            "project.parent.artifactId" => self.parent.as_ref().map(|p| p.artifact_id.clone()),
            "project.parent.version" => self.parent.as_ref().map(|p| p.version.clone()),
            _ => self.properties.get(key).cloned(),
        }
    }

    /// Interpolate all property references in dependencies, dependency
    /// management, repositories and the relocation target.
    pub fn resolve_properties(&mut self) {
        let pom_snapshot = self.clone();
        let interpolate_opt = |value: &mut Option<String>| {
            if let Some(ref v) = value {
                *value = Some(pom_snapshot.interpolate(v));
            }
        };
        for dep in self
            .dependencies
            .iter_mut()
            .chain(self.dependency_management.iter_mut())
        {
            dep.group_id = pom_snapshot.interpolate(&dep.group_id);
            dep.artifact_id = pom_snapshot.interpolate(&dep.artifact_id);
            interpolate_opt(&mut dep.version);
            interpolate_opt(&mut dep.scope);
            interpolate_opt(&mut dep.classifier);
            interpolate_opt(&mut dep.type_);
            interpolate_opt(&mut dep.system_path);
        }
        for repo in &mut self.repositories {
            repo.url = pom_snapshot.interpolate(&repo.url);
        }
        if let Some(ref mut relocation) = self.relocation {
            interpolate_opt(&mut relocation.group_id);
            interpolate_opt(&mut relocation.artifact_id);
            interpolate_opt(&mut relocation.version);
        }
    }

    /// Merge a parent POM's properties, dependencies, dependency management and
    /// repositories into this POM. Values declared by this POM win.
    pub fn apply_parent(&mut self, parent: &Pom) {
        for (k, v) in &parent.properties {
            self.properties
                .entry(k.clone())
                .or_insert_with(|| v.clone());
        }
        if self.group_id.is_none() {
            self.group_id = parent.effective_group_id().map(|s| s.to_string());
        }
        if self.version.is_none() {
            self.version = parent.effective_version().map(|s| s.to_string());
        }
        for dm in &parent.dependency_management {
            let dominated = self
                .dependency_management
                .iter()
                .any(|d| d.management_key() == dm.management_key());
            if !dominated {
                self.dependency_management.push(dm.clone());
            }
        }
        for dep in &parent.dependencies {
            let dominated = self
                .dependencies
                .iter()
                .any(|d| d.management_key() == dep.management_key());
            if !dominated {
                self.dependencies.push(dep.clone());
            }
        }
        for repo in &parent.repositories {
            if !self.repositories.iter().any(|r| r.id == repo.id) {
                self.repositories.push(repo.clone());
            }
        }
    }

    /// Import a BOM's dependency management. Entries already managed here win.
    pub fn import_management(&mut self, bom: &Pom) {
        for dm in &bom.dependency_management {
            if !self
                .dependency_management
                .iter()
                .any(|d| d.management_key() == dm.management_key())
            {
                self.dependency_management.push(dm.clone());
            }
        }
    }

    /// Look up a version from dependency management for a given group:artifact.
    pub fn managed_version(&self, group_id: &str, artifact_id: &str) -> Option<&str> {
        self.dependency_management
            .iter()
            .find(|d| d.group_id == group_id && d.artifact_id == artifact_id)
            .and_then(|d| d.version.as_deref())
    }

    /// Fill in versions and scopes of dependencies that omit them from this
    /// POM's own dependency management.
    pub fn apply_own_management(&mut self) {
        let managed = self.dependency_management.clone();
        for dep in &mut self.dependencies {
            let Some(dm) = managed
                .iter()
                .find(|d| d.management_key() == dep.management_key())
            else {
                continue;
            };
            if dep.version.as_deref().map_or(true, str::is_empty) {
                dep.version = dm.version.clone();
            }
            if dep.scope.is_none() {
                dep.scope = dm.scope.clone();
            }
            if dep.exclusions.is_empty() {
                dep.exclusions = dm.exclusions.clone();
            }
        }
    }

    /// Return BOM imports from dependency management
    /// (entries with `scope = "import"` and `type = "pom"`).
    pub fn bom_imports(&self) -> Vec<&PomDependency> {
        self.dependency_management
            .iter()
            .filter(|d| d.is_bom_import())
            .collect()
    }

    /// Drop BOM import entries once they have been expanded.
    pub fn remove_bom_imports(&mut self) {
        self.dependency_management.retain(|d| !d.is_bom_import());
    }

    /// Declared dependencies converted to resolver values, skipping entries
    /// without coordinates.
    pub fn to_dependencies(&self) -> Vec<Dependency> {
        self.dependencies
            .iter()
            .filter_map(PomDependency::to_dependency)
            .collect()
    }

    pub fn to_managed_dependencies(&self) -> Vec<Dependency> {
        self.dependency_management
            .iter()
            .filter_map(PomDependency::to_managed_dependency)
            .collect()
    }

    /// Declared repositories as remote repositories.
    pub fn to_repositories(&self) -> Vec<RemoteRepository> {
        self.repositories
            .iter()
            .filter(|r| !r.id.is_empty() && !r.url.is_empty())
            .map(PomRepository::to_remote)
            .collect()
    }
}

impl PomDependency {
    /// `group:artifact:type:classifier`, the key inheritance and management merge on.
    pub fn management_key(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.group_id,
            self.artifact_id,
            self.type_.as_deref().unwrap_or("jar"),
            self.classifier.as_deref().unwrap_or("")
        )
    }

    pub fn is_bom_import(&self) -> bool {
        self.scope.as_deref() == Some(scope::IMPORT)
            && self.type_.as_deref().unwrap_or("jar") == "pom"
    }

    fn artifact(&self) -> Option<Artifact> {
        if self.group_id.is_empty() || self.artifact_id.is_empty() {
            return None;
        }
        let type_ = self.type_.as_deref().unwrap_or("jar");
        let handler = artifact_type(type_);
        let classifier = self
            .classifier
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(handler.classifier);
        let mut artifact = Artifact::new(
            self.group_id.clone(),
            self.artifact_id.clone(),
            classifier,
            handler.extension,
            self.version.clone().unwrap_or_default(),
        )
        .with_property(props::TYPE, type_)
        .with_property(props::LANGUAGE, handler.language);
        if handler.includes_dependencies {
            artifact = artifact.with_property(props::INCLUDES_DEPENDENCIES, "true");
        }
        if handler.constitutes_build_path {
            artifact = artifact.with_property(props::CONSTITUTES_BUILD_PATH, "true");
        }
        if let Some(path) = self.system_path.as_deref().filter(|p| !p.is_empty()) {
            artifact = artifact.with_property(props::LOCAL_PATH, path);
        }
        Some(artifact)
    }

    fn exclusions(&self) -> Vec<Exclusion> {
        self.exclusions
            .iter()
            .map(|e| {
                Exclusion::new(
                    e.group_id.clone(),
                    e.artifact_id.clone().unwrap_or_else(|| "*".to_string()),
                    "*",
                    "*",
                )
            })
            .collect()
    }

    /// A declared dependency; the scope defaults to `compile`.
    pub fn to_dependency(&self) -> Option<Dependency> {
        let artifact = self.artifact()?;
        Some(
            Dependency::new(artifact, self.scope.clone().unwrap_or_else(|| scope::COMPILE.to_string()))
                .with_optional(self.optional)
                .with_exclusions(self.exclusions()),
        )
    }

    /// A managed dependency; an undeclared scope stays empty so that it does
    /// not override the scope of the dependency it manages.
    pub fn to_managed_dependency(&self) -> Option<Dependency> {
        let artifact = self.artifact()?;
        Some(
            Dependency::new(artifact, self.scope.clone().unwrap_or_default())
                .with_optional(self.optional)
                .with_exclusions(self.exclusions()),
        )
    }
}

impl PomRepository {
    pub fn to_remote(&self) -> RemoteRepository {
        let mut repo = RemoteRepository::new(self.id.clone(), self.url.clone())
            .with_release_policy(policy(self.releases.as_ref()))
            .with_snapshot_policy(policy(self.snapshots.as_ref()));
        if let Some(layout) = self.layout.as_deref().filter(|l| !l.is_empty()) {
            repo.content_type = layout.to_string();
        }
        repo
    }
}

fn policy(declared: Option<&PomRepositoryPolicy>) -> RepositoryPolicy {
    let mut policy = RepositoryPolicy::default();
    if let Some(declared) = declared {
        policy.enabled = declared.enabled.unwrap_or(true);
        if let Some(update) = declared.update_policy.as_deref() {
            policy.update_policy = update.parse().unwrap_or(UpdatePolicy::Daily);
        }
    }
    policy
}

/// How a dependency `type` maps onto an artifact.
struct ArtifactType<'a> {
    extension: &'a str,
    classifier: &'a str,
    language: &'a str,
    includes_dependencies: bool,
    constitutes_build_path: bool,
}

fn artifact_type(type_: &str) -> ArtifactType<'_> {
    let (extension, classifier, language, includes_dependencies, constitutes_build_path) =
        match type_ {
            "pom" => ("pom", "", "none", false, false),
            "jar" | "ejb" | "maven-plugin" | "bundle" => ("jar", "", "java", false, true),
            "test-jar" => ("jar", "tests", "java", false, true),
            "ejb-client" => ("jar", "client", "java", false, true),
            "javadoc" => ("jar", "javadoc", "java", false, false),
            "java-source" => ("jar", "sources", "java", false, false),
            "war" => ("war", "", "java", true, false),
            "ear" => ("ear", "", "java", true, false),
            "rar" => ("rar", "", "java", true, false),
            "par" => ("par", "", "java", true, false),
            // Unknown types use the type name as the extension.
            other => (other, "", "none", false, false),
        };
    ArtifactType {
        extension,
        classifier,
        language,
        includes_dependencies,
        constitutes_build_path,
    }
}

/// Parse a POM XML string into a `Pom` struct.
pub fn parse_pom(xml: &str) -> Result<Pom, QuarryError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut path: Vec<String> = Vec::new();
    let mut text_buf = String::new();
    let mut saw_project = false;

    // Temporary accumulators for nested elements
    let mut current_dep: Option<PomDependency> = None;
    let mut current_exclusion: Option<PomExclusion> = None;
    let mut current_parent: Option<ParentRef> = None;
    let mut current_repo: Option<PomRepository> = None;
    let mut in_dep_mgmt = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                path.push(tag);
                text_buf.clear();

                let ctx = path_context(&path);
                if ctx == "project" {
                    saw_project = true;
                }

                match ctx.as_str() {
                    "project>dependencyManagement>dependencies>dependency"
                    | "project>dependencies>dependency" => {
                        in_dep_mgmt = ctx.contains("dependencyManagement");
                        current_dep = Some(PomDependency::default());
                    }
                    _ if ctx.ends_with(">exclusion") && current_dep.is_some() => {
                        current_exclusion = Some(PomExclusion {
                            group_id: String::new(),
                            artifact_id: None,
                        });
                    }
                    "project>parent" => {
                        current_parent = Some(ParentRef {
                            group_id: String::new(),
                            artifact_id: String::new(),
                            version: String::new(),
                            relative_path: None,
                        });
                    }
                    "project>repositories>repository" => {
                        current_repo = Some(PomRepository::default());
                    }
                    "project>distributionManagement>relocation" => {
                        pom.relocation = Some(Relocation::default());
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                text_buf = e.unescape().unwrap_or_default().to_string();
            }
            Ok(Event::End(_)) => {
                let ctx = path_context(&path);
                let depth = path.len();
                let last = path.last().map(|s| s.as_str());

                // Properties: <project><properties><key>value</key></properties>
                if depth == 3 && path.get(1).map(|s| s.as_str()) == Some("properties") {
                    let prop_name = path.last().cloned().unwrap_or_default();
                    pom.properties.insert(prop_name, text_buf.clone());
                }

                // Handle dependency fields
                if let Some(ref mut dep) = current_dep {
                    if let Some(ref mut excl) = current_exclusion {
                        match last {
                            Some("groupId") => excl.group_id = text_buf.clone(),
                            Some("artifactId") => excl.artifact_id = Some(text_buf.clone()),
                            _ => {}
                        }
                        if ctx.ends_with(">exclusion") {
                            if let Some(excl) = current_exclusion.take() {
                                dep.exclusions.push(excl);
                            }
                        }
                    } else {
                        match last {
                            Some("groupId") if ctx.ends_with(">dependency>groupId") => {
                                dep.group_id = text_buf.clone();
                            }
                            Some("artifactId") if ctx.ends_with(">dependency>artifactId") => {
                                dep.artifact_id = text_buf.clone();
                            }
                            Some("version") if ctx.ends_with(">dependency>version") => {
                                dep.version = Some(text_buf.clone());
                            }
                            Some("scope") if ctx.ends_with(">dependency>scope") => {
                                dep.scope = Some(text_buf.clone());
                            }
                            Some("optional") if ctx.ends_with(">dependency>optional") => {
                                dep.optional = Some(text_buf.trim() == "true");
                            }
                            Some("classifier") if ctx.ends_with(">dependency>classifier") => {
                                dep.classifier = Some(text_buf.clone());
                            }
                            Some("type") if ctx.ends_with(">dependency>type") => {
                                dep.type_ = Some(text_buf.clone());
                            }
                            Some("systemPath") if ctx.ends_with(">dependency>systemPath") => {
                                dep.system_path = Some(text_buf.clone());
                            }
                            _ => {}
                        }
                    }

                    if ctx == "project>dependencies>dependency"
                        || ctx == "project>dependencyManagement>dependencies>dependency"
                    {
                        if let Some(dep) = current_dep.take() {
                            if in_dep_mgmt {
                                pom.dependency_management.push(dep);
                            } else {
                                pom.dependencies.push(dep);
                            }
                        }
                        in_dep_mgmt = false;
                    }
                }

                // Handle parent fields
                if let Some(ref mut parent) = current_parent {
                    match ctx.as_str() {
                        "project>parent>groupId" => parent.group_id = text_buf.clone(),
                        "project>parent>artifactId" => parent.artifact_id = text_buf.clone(),
                        "project>parent>version" => parent.version = text_buf.clone(),
                        "project>parent>relativePath" => {
                            parent.relative_path = Some(text_buf.clone());
                        }
                        "project>parent" => pom.parent = current_parent.take(),
                        _ => {}
                    }
                }

                // Handle repository fields
                if let Some(ref mut repo) = current_repo {
                    const PREFIX: &str = "project>repositories>repository";
                    match ctx.strip_prefix(PREFIX).unwrap_or("") {
                        ">id" => repo.id = text_buf.trim().to_string(),
                        ">url" => repo.url = text_buf.trim().to_string(),
                        ">layout" => repo.layout = Some(text_buf.trim().to_string()),
                        ">releases>enabled" => {
                            repo.releases.get_or_insert_with(Default::default).enabled =
                                Some(text_buf.trim() == "true");
                        }
                        ">releases>updatePolicy" => {
                            repo.releases
                                .get_or_insert_with(Default::default)
                                .update_policy = Some(text_buf.trim().to_string());
                        }
                        ">snapshots>enabled" => {
                            repo.snapshots.get_or_insert_with(Default::default).enabled =
                                Some(text_buf.trim() == "true");
                        }
                        ">snapshots>updatePolicy" => {
                            repo.snapshots
                                .get_or_insert_with(Default::default)
                                .update_policy = Some(text_buf.trim().to_string());
                        }
                        "" if ctx == PREFIX => {
                            if let Some(repo) = current_repo.take() {
                                pom.repositories.push(repo);
                            }
                        }
                        _ => {}
                    }
                }

                // Relocation
                if let Some(ref mut relocation) = pom.relocation {
                    let value = Some(text_buf.trim().to_string()).filter(|v| !v.is_empty());
                    match ctx.as_str() {
                        "project>distributionManagement>relocation>groupId" => {
                            relocation.group_id = value;
                        }
                        "project>distributionManagement>relocation>artifactId" => {
                            relocation.artifact_id = value;
                        }
                        "project>distributionManagement>relocation>version" => {
                            relocation.version = value;
                        }
                        "project>distributionManagement>relocation>message" => {
                            relocation.message = value;
                        }
                        _ => {}
                    }
                }

                // Top-level project fields
                if depth == 2 {
                    match last {
                        Some("groupId") => pom.group_id = Some(text_buf.clone()),
                        Some("artifactId") => pom.artifact_id = Some(text_buf.clone()),
                        Some("version") => pom.version = Some(text_buf.clone()),
                        Some("packaging") => pom.packaging = Some(text_buf.clone()),
                        _ => {}
                    }
                }

                path.pop();
                text_buf.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(QuarryError::parse("POM", e)),
            _ => {}
        }
    }

    if !saw_project {
        return Err(QuarryError::parse("POM", "missing <project> root element"));
    }
    Ok(pom)
}

/// Build a context string from the current XML path for matching.
fn path_context(path: &[String]) -> String {
    path.join(">")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
    <modelVersion>4.0.0</modelVersion>
    <groupId>org.example</groupId>
    <artifactId>my-lib</artifactId>
    <version>1.0.0</version>
    <packaging>jar</packaging>

    <properties>
        <kotlin.version>2.3.0</kotlin.version>
    </properties>

    <dependencies>
        <dependency>
            <groupId>org.jetbrains.kotlin</groupId>
            <artifactId>kotlin-stdlib</artifactId>
            <version>${kotlin.version}</version>
        </dependency>
        <dependency>
            <groupId>junit</groupId>
            <artifactId>junit</artifactId>
            <version>4.13.2</version>
            <scope>test</scope>
        </dependency>
    </dependencies>
</project>"#;

    #[test]
    fn parse_simple_pom() {
        let pom = parse_pom(SIMPLE_POM).unwrap();
        assert_eq!(pom.group_id.as_deref(), Some("org.example"));
        assert_eq!(pom.artifact_id.as_deref(), Some("my-lib"));
        assert_eq!(pom.version.as_deref(), Some("1.0.0"));
        assert_eq!(pom.packaging.as_deref(), Some("jar"));
        assert_eq!(pom.dependencies.len(), 2);
        assert_eq!(pom.properties.get("kotlin.version").unwrap(), "2.3.0");
    }

    #[test]
    fn property_interpolation() {
        let mut pom = parse_pom(SIMPLE_POM).unwrap();
        pom.resolve_properties();
        assert_eq!(pom.dependencies[0].version.as_deref(), Some("2.3.0"));
    }

    #[test]
    fn scope_defaults_to_compile_on_conversion() {
        let pom = parse_pom(SIMPLE_POM).unwrap();
        let deps = pom.to_dependencies();
        assert_eq!(deps[0].scope, "compile");
        assert_eq!(deps[1].scope, "test");
        assert_eq!(deps[1].artifact.extension, "jar");
    }

    #[test]
    fn test_jar_maps_to_tests_classifier() {
        let dep = PomDependency {
            group_id: "g".into(),
            artifact_id: "a".into(),
            version: Some("1.0".into()),
            type_: Some("test-jar".into()),
            ..Default::default()
        };
        let d = dep.to_dependency().unwrap();
        assert_eq!(d.artifact.extension, "jar");
        assert_eq!(d.artifact.classifier, "tests");
        assert_eq!(d.artifact.property(props::TYPE), Some("test-jar"));
    }

    #[test]
    fn war_includes_dependencies() {
        let dep = PomDependency {
            group_id: "g".into(),
            artifact_id: "web".into(),
            version: Some("1.0".into()),
            type_: Some("war".into()),
            ..Default::default()
        };
        let d = dep.to_dependency().unwrap();
        assert_eq!(d.artifact.extension, "war");
        assert_eq!(d.artifact.property(props::INCLUDES_DEPENDENCIES), Some("true"));
    }

    #[test]
    fn dependency_management_and_bom() {
        let xml = r#"<?xml version="1.0"?>
<project>
    <groupId>org.example</groupId>
    <artifactId>parent</artifactId>
    <version>1.0.0</version>

    <dependencyManagement>
        <dependencies>
            <dependency>
                <groupId>org.jetbrains.kotlinx</groupId>
                <artifactId>kotlinx-coroutines-bom</artifactId>
                <version>1.8.0</version>
                <type>pom</type>
                <scope>import</scope>
            </dependency>
            <dependency>
                <groupId>com.google.guava</groupId>
                <artifactId>guava</artifactId>
                <version>32.0.0-jre</version>
            </dependency>
        </dependencies>
    </dependencyManagement>
</project>"#;
        let mut pom = parse_pom(xml).unwrap();
        assert_eq!(pom.dependency_management.len(), 2);
        let boms = pom.bom_imports();
        assert_eq!(boms.len(), 1);
        assert_eq!(boms[0].artifact_id, "kotlinx-coroutines-bom");

        assert_eq!(
            pom.managed_version("com.google.guava", "guava"),
            Some("32.0.0-jre")
        );
        pom.remove_bom_imports();
        assert_eq!(pom.dependency_management.len(), 1);
        assert_eq!(pom.to_managed_dependencies()[0].scope, "");
    }

    #[test]
    fn own_management_fills_missing_versions() {
        let xml = r#"<project>
    <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
    <dependencyManagement><dependencies>
        <dependency><groupId>x</groupId><artifactId>y</artifactId><version>2.5</version><scope>runtime</scope></dependency>
    </dependencies></dependencyManagement>
    <dependencies>
        <dependency><groupId>x</groupId><artifactId>y</artifactId></dependency>
    </dependencies>
</project>"#;
        let mut pom = parse_pom(xml).unwrap();
        pom.apply_own_management();
        assert_eq!(pom.dependencies[0].version.as_deref(), Some("2.5"));
        assert_eq!(pom.dependencies[0].scope.as_deref(), Some("runtime"));
    }

    #[test]
    fn parent_ref_parsing() {
        let xml = r#"<?xml version="1.0"?>
<project>
    <parent>
        <groupId>org.example</groupId>
        <artifactId>parent-pom</artifactId>
        <version>2.0.0</version>
    </parent>
    <artifactId>child</artifactId>
</project>"#;
        let pom = parse_pom(xml).unwrap();
        assert_eq!(pom.effective_group_id(), Some("org.example"));
        assert_eq!(pom.effective_version(), Some("2.0.0"));
        let p = pom.parent.as_ref().unwrap();
        assert_eq!(p.artifact_id, "parent-pom");
    }

    #[test]
    fn apply_parent_inherits_dependencies_and_properties() {
        let parent = parse_pom(
            r#"<project><groupId>p</groupId><artifactId>parent</artifactId><version>3</version>
            <properties><lib.version>9.9</lib.version></properties>
            <dependencies><dependency><groupId>x</groupId><artifactId>inherited</artifactId><version>${lib.version}</version></dependency></dependencies>
            </project>"#,
        )
        .unwrap();
        let mut child = parse_pom(
            r#"<project><parent><groupId>p</groupId><artifactId>parent</artifactId><version>3</version></parent>
            <artifactId>child</artifactId></project>"#,
        )
        .unwrap();
        child.apply_parent(&parent);
        child.resolve_properties();
        assert_eq!(child.version.as_deref(), Some("3"));
        assert_eq!(child.dependencies.len(), 1);
        assert_eq!(child.dependencies[0].version.as_deref(), Some("9.9"));
    }

    #[test]
    fn exclusion_parsing() {
        let xml = r#"<?xml version="1.0"?>
<project>
    <groupId>org.example</groupId>
    <artifactId>app</artifactId>
    <version>1.0</version>
    <dependencies>
        <dependency>
            <groupId>com.example</groupId>
            <artifactId>lib</artifactId>
            <version>1.0</version>
            <optional>true</optional>
            <exclusions>
                <exclusion>
                    <groupId>commons-logging</groupId>
                    <artifactId>commons-logging</artifactId>
                </exclusion>
            </exclusions>
        </dependency>
    </dependencies>
</project>"#;
        let pom = parse_pom(xml).unwrap();
        let dep = pom.dependencies[0].to_dependency().unwrap();
        assert!(dep.is_optional());
        assert_eq!(dep.exclusions.len(), 1);
        assert_eq!(dep.exclusions[0].group_id, "commons-logging");
        assert_eq!(dep.exclusions[0].classifier, "*");
    }

    #[test]
    fn relocation_parsing() {
        let xml = r#"<project>
    <groupId>old</groupId><artifactId>lib</artifactId><version>1.0</version>
    <distributionManagement>
        <relocation>
            <groupId>new</groupId>
            <message>moved</message>
        </relocation>
    </distributionManagement>
</project>"#;
        let pom = parse_pom(xml).unwrap();
        let relocation = pom.relocation.unwrap();
        assert_eq!(relocation.group_id.as_deref(), Some("new"));
        assert_eq!(relocation.artifact_id, None);
        assert_eq!(relocation.message.as_deref(), Some("moved"));
    }

    #[test]
    fn repositories_parsing() {
        let xml = r#"<project>
    <groupId>g</groupId><artifactId>a</artifactId><version>1</version>
    <repositories>
        <repository>
            <id>snapshots</id>
            <url>https://repo.example.com/snapshots/</url>
            <releases><enabled>false</enabled></releases>
            <snapshots><updatePolicy>always</updatePolicy></snapshots>
        </repository>
    </repositories>
</project>"#;
        let pom = parse_pom(xml).unwrap();
        let repos = pom.to_repositories();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].url, "https://repo.example.com/snapshots");
        assert!(!repos[0].release_policy.enabled);
        assert!(repos[0].snapshot_policy.enabled);
        assert_eq!(repos[0].snapshot_policy.update_policy, UpdatePolicy::Always);
    }

    #[test]
    fn not_a_pom() {
        assert!(parse_pom("<metadata/>").is_err());
        assert!(parse_pom("<project><dependencies></project>").is_err());
    }
}
