//! Artifact descriptors: the dependencies, dependency management and
//! repositories an artifact declares, read from its POM.
//!
//! Relocations are followed until an artifact that has not moved is reached.
//! Parent POMs and imported BOMs are folded into the descriptor before it is
//! converted.

use std::sync::Arc;

use async_recursion::async_recursion;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use quarry_core::artifact::Artifact;
use quarry_core::dependency::Dependency;
use quarry_core::repository::{ArtifactRepository, RemoteRepository};
use quarry_maven::pom::{parse_pom, Pom};

use crate::artifact_resolver::{ArtifactRequest, ArtifactResolver};
use crate::cache::VisitedSet;
use crate::error::ResolverError;
use crate::remote::RemoteRepositoryManager;
use crate::session::ResolutionSession;

#[derive(Debug, Clone)]
pub struct ArtifactDescriptorRequest {
    pub artifact: Artifact,
    pub repositories: Vec<RemoteRepository>,
}

impl ArtifactDescriptorRequest {
    pub fn new(artifact: Artifact, repositories: Vec<RemoteRepository>) -> Self {
        Self {
            artifact,
            repositories,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactDescriptorResult {
    /// The artifact the descriptor belongs to, after relocation.
    pub artifact: Artifact,
    /// Every artifact that was relocated on the way, in order.
    pub relocations: Vec<Artifact>,
    pub dependencies: Vec<Dependency>,
    pub managed_dependencies: Vec<Dependency>,
    pub repositories: Vec<RemoteRepository>,
    /// Where the descriptor was read from.
    pub repository: Option<ArtifactRepository>,
}

impl ArtifactDescriptorResult {
    /// A descriptor declaring nothing.
    pub fn empty(artifact: Artifact) -> Self {
        Self {
            artifact,
            relocations: Vec::new(),
            dependencies: Vec::new(),
            managed_dependencies: Vec::new(),
            repositories: Vec::new(),
            repository: None,
        }
    }

    pub fn is_relocated(&self) -> bool {
        !self.relocations.is_empty()
    }
}

#[async_trait]
pub trait ArtifactDescriptorReader: Send + Sync {
    async fn read_descriptor(
        &self,
        session: &ResolutionSession,
        request: &ArtifactDescriptorRequest,
    ) -> Result<ArtifactDescriptorResult, ResolverError>;
}

/// Reads descriptors from POM files resolved through an [`ArtifactResolver`].
pub struct PomDescriptorReader {
    artifacts: Arc<dyn ArtifactResolver>,
}

impl PomDescriptorReader {
    pub fn new(artifacts: Arc<dyn ArtifactResolver>) -> Self {
        Self { artifacts }
    }
}

/// Why a POM could not be loaded.
enum PomError {
    /// No repository has it.
    Missing(ResolverError),
    /// A repository could not be reached or returned a broken transfer.
    Transfer(ResolverError),
    /// It was fetched but cannot be read or built.
    Invalid(String),
}

impl PomError {
    fn message(self) -> String {
        match self {
            PomError::Missing(e) | PomError::Transfer(e) => e.to_string(),
            PomError::Invalid(message) => message,
        }
    }

    /// A failure while loading a parent or import of the POM being built.
    /// A missing ancestor makes the POM itself invalid.
    fn nested(self, context: impl std::fmt::Display) -> PomError {
        match self {
            PomError::Transfer(e) => PomError::Transfer(e),
            other => PomError::Invalid(format!("{context}: {}", other.message())),
        }
    }
}

#[async_trait]
impl ArtifactDescriptorReader for PomDescriptorReader {
    async fn read_descriptor(
        &self,
        session: &ResolutionSession,
        request: &ArtifactDescriptorRequest,
    ) -> Result<ArtifactDescriptorResult, ResolverError> {
        if let Some(cached) = session.data_pool.descriptor(&request.artifact, &request.repositories) {
            return Ok(cached.as_ref().clone());
        }

        let mut result = ArtifactDescriptorResult::empty(request.artifact.clone());
        let mut visited = VisitedSet::new();
        let mut artifact = request.artifact.clone();

        loop {
            if !visited.visit(&artifact.group_id, &artifact.artifact_id, &artifact.base_version()) {
                return Err(ResolverError::RelocationCycle {
                    chain: visited.chain().to_vec(),
                });
            }
            result.artifact = artifact.clone();

            let loaded = self.load(session, &artifact, &request.repositories).await;
            let effective = match loaded {
                Ok((pom, repository)) => {
                    result.repository = repository;
                    let repositories = descriptor_repositories(session, &request.repositories, &pom);
                    self.effective_pom(session, pom, &artifact, &repositories, &mut Vec::new())
                        .await
                }
                Err(e) => Err(e),
            };
            let pom = match effective {
                Ok(pom) => pom,
                Err(PomError::Missing(e)) if session.ignore_missing_descriptors => {
                    debug!(artifact = %artifact, "descriptor missing, assuming no dependencies: {e}");
                    break;
                }
                Err(PomError::Invalid(message)) if session.ignore_invalid_descriptors => {
                    warn!("Invalid descriptor for {artifact}, assuming no dependencies: {message}");
                    break;
                }
                Err(e) => {
                    return Err(ResolverError::Descriptor {
                        artifact: artifact.to_string(),
                        message: e.message(),
                    })
                }
            };

            if let Some(target) = relocation_target(&artifact, &pom) {
                match pom.relocation.as_ref().and_then(|r| r.message.as_deref()) {
                    Some(message) => info!("{artifact} has been relocated to {target}: {message}"),
                    None => info!("{artifact} has been relocated to {target}"),
                }
                result.relocations.push(artifact);
                artifact = target;
                continue;
            }

            result.dependencies = pom.to_dependencies();
            result.managed_dependencies = pom.to_managed_dependencies();
            if !session.ignore_descriptor_repositories {
                result.repositories = pom.to_repositories();
            }
            break;
        }

        session.data_pool.put_descriptor(
            &request.artifact,
            &request.repositories,
            Arc::new(result.clone()),
        );
        Ok(result)
    }
}

impl PomDescriptorReader {
    /// Resolve and parse the POM of `artifact`.
    async fn load(
        &self,
        session: &ResolutionSession,
        artifact: &Artifact,
        repositories: &[RemoteRepository],
    ) -> Result<(Pom, Option<ArtifactRepository>), PomError> {
        let request = ArtifactRequest::new(artifact.pom(), repositories.to_vec());
        let resolved = match self.artifacts.resolve_artifact(session, request).await {
            Ok(resolved) => resolved,
            Err(e) if e.is_not_found() => return Err(PomError::Missing(e)),
            Err(e) => return Err(PomError::Transfer(e)),
        };
        let Some(file) = resolved.artifact.as_ref().and_then(Artifact::file) else {
            return Err(PomError::Invalid(format!("no file resolved for {}", artifact.pom())));
        };
        let xml = std::fs::read_to_string(file)
            .map_err(|e| PomError::Invalid(format!("failed to read {}: {e}", file.display())))?;
        let pom = parse_pom(&xml).map_err(|e| PomError::Invalid(e.to_string()))?;
        Ok((pom, resolved.repository))
    }

    /// Fold parents into `pom`, interpolate it and expand its BOM imports.
    ///
    /// `imports` holds the BOMs being expanded further up, to detect import
    /// cycles.
    #[async_recursion]
    async fn effective_pom(
        &self,
        session: &ResolutionSession,
        mut pom: Pom,
        artifact: &Artifact,
        repositories: &[RemoteRepository],
        imports: &mut Vec<String>,
    ) -> Result<Pom, PomError> {
        let mut seen = VisitedSet::new();
        seen.visit(&artifact.group_id, &artifact.artifact_id, &artifact.version);

        let mut lineage: Vec<Pom> = Vec::new();
        let mut next = pom.parent.clone();
        while let Some(parent) = next {
            if !seen.visit(&parent.group_id, &parent.artifact_id, &parent.version) {
                return Err(PomError::Invalid(format!(
                    "parent POMs form a cycle: {}",
                    seen.chain().join(" -> ")
                )));
            }
            let parent_artifact = Artifact::new(
                parent.group_id,
                parent.artifact_id,
                "",
                "pom",
                parent.version,
            );
            let (parent_pom, _) = self
                .load(session, &parent_artifact, repositories)
                .await
                .map_err(|e| e.nested(format!("parent {parent_artifact}")))?;
            next = parent_pom.parent.clone();
            lineage.push(parent_pom);
        }

        let mut inherited: Option<Pom> = None;
        for mut parent in lineage.into_iter().rev() {
            if let Some(above) = &inherited {
                parent.apply_parent(above);
            }
            inherited = Some(parent);
        }
        if let Some(inherited) = &inherited {
            pom.apply_parent(inherited);
        }
        pom.resolve_properties();

        let boms: Vec<Artifact> = pom
            .bom_imports()
            .into_iter()
            .filter_map(|d| {
                let version = d.version.as_deref().filter(|v| !v.is_empty())?;
                Some(Artifact::new(
                    d.group_id.clone(),
                    d.artifact_id.clone(),
                    "",
                    "pom",
                    version,
                ))
            })
            .collect();
        pom.remove_bom_imports();

        for bom in boms {
            let key = bom.key();
            if imports.contains(&key) {
                return Err(PomError::Invalid(format!(
                    "BOM imports form a cycle: {} -> {key}",
                    imports.join(" -> ")
                )));
            }
            let (raw, _) = self
                .load(session, &bom, repositories)
                .await
                .map_err(|e| e.nested(format!("import {bom}")))?;
            imports.push(key);
            let imported = self
                .effective_pom(session, raw, &bom, repositories, imports)
                .await?;
            imports.pop();
            pom.import_management(&imported);
        }

        pom.apply_own_management();
        Ok(pom)
    }
}

/// Repositories to fetch parents and imports of `pom` from: the requested
/// ones followed by those the POM declares.
fn descriptor_repositories(
    session: &ResolutionSession,
    requested: &[RemoteRepository],
    pom: &Pom,
) -> Vec<RemoteRepository> {
    if session.ignore_descriptor_repositories {
        return requested.to_vec();
    }
    RemoteRepositoryManager::aggregate(session, requested, &pom.to_repositories(), true)
}

/// The coordinate a POM relocates `artifact` to, if it points elsewhere.
/// Fields the relocation leaves out keep the artifact's values.
fn relocation_target(artifact: &Artifact, pom: &Pom) -> Option<Artifact> {
    let relocation = pom.relocation.as_ref()?;
    let pick = |value: &Option<String>, current: &str| -> String {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or(current)
            .to_string()
    };
    let group_id = pick(&relocation.group_id, &artifact.group_id);
    let artifact_id = pick(&relocation.artifact_id, &artifact.artifact_id);
    let version = pick(&relocation.version, &artifact.version);
    if group_id == artifact.group_id && artifact_id == artifact.artifact_id && version == artifact.version {
        return None;
    }
    Some(artifact.relocated(&group_id, &artifact_id, &version))
}
