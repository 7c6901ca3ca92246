//! Resolution failures.
//!
//! Leaf operations (one descriptor, one version) fail with a single variant.
//! Aggregate operations collect every per-item failure into
//! [`ResolverError::ArtifactResolution`] or
//! [`ResolverError::DependencyCollection`] instead of stopping at the first.

use miette::Diagnostic;
use thiserror::Error;

use quarry_maven::connector::NoConnectorError;
use quarry_maven::transfer::TransferError;
use quarry_util::errors::QuarryError;

use crate::artifact_resolver::ArtifactResult;
use crate::graph::DependencyGraph;

#[derive(Debug, Error, Diagnostic)]
pub enum ResolverError {
    #[error("Could not find artifact {artifact}{}", in_repositories(.repositories))]
    #[diagnostic(help("Check the coordinates and the configured repositories"))]
    ArtifactNotFound {
        artifact: String,
        repositories: Vec<String>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Transfer(#[from] TransferError),

    #[error("{}", summarize(.results))]
    ArtifactResolution { results: Vec<ArtifactResult> },

    #[error("Failed to resolve version for {artifact}: {message}")]
    VersionResolution { artifact: String, message: String },

    #[error("Failed to resolve version range for {artifact}: {message}")]
    VersionRangeResolution { artifact: String, message: String },

    #[error("Failed to read artifact descriptor for {artifact}: {message}")]
    #[diagnostic(help(
        "Set ignore-missing-descriptors or ignore-invalid-descriptors to continue without it"
    ))]
    Descriptor { artifact: String, message: String },

    #[error("Relocations form a cycle: {}", .chain.join(" -> "))]
    RelocationCycle { chain: Vec<String> },

    #[error("Failed to collect dependencies of {root}: {} problem(s)", .errors.len())]
    DependencyCollection {
        root: String,
        /// The graph as far as it could be built.
        graph: Box<DependencyGraph>,
        #[related]
        errors: Vec<ResolverError>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    NoConnector(#[from] NoConnectorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Util(#[from] QuarryError),
}

impl ResolverError {
    /// Whether the failure only says that something does not exist, as
    /// opposed to being unreachable or broken.
    pub fn is_not_found(&self) -> bool {
        match self {
            ResolverError::ArtifactNotFound { .. } => true,
            ResolverError::Transfer(e) => e.is_not_found(),
            ResolverError::ArtifactResolution { results } => results
                .iter()
                .flat_map(|r| r.errors.iter())
                .all(ResolverError::is_not_found),
            _ => false,
        }
    }
}

fn in_repositories(repositories: &[String]) -> String {
    if repositories.is_empty() {
        String::new()
    } else {
        format!(" in {}", repositories.join(", "))
    }
}

fn summarize(results: &[ArtifactResult]) -> String {
    let failed: Vec<&ArtifactResult> = results.iter().filter(|r| !r.is_resolved()).collect();
    let mut message = format!("Failed to resolve {} artifact(s)", failed.len());
    for result in failed {
        message.push_str(&format!("\n  {}", result.request.artifact));
        if let Some(first) = result.errors.first() {
            message.push_str(&format!(": {first}"));
        }
    }
    message
}
