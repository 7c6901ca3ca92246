//! The entry point wiring every resolver component together.

use std::sync::Arc;

use tracing::info;

use quarry_core::repository::RemoteRepository;
use quarry_maven::connector::RepositoryConnectorProvider;

use crate::artifact_resolver::{ArtifactRequest, ArtifactResolver, ArtifactResult, DefaultArtifactResolver};
use crate::collector::{
    CollectRequest, CollectResult, DefaultDependencyCollector, DependencyCollector, DependencyCycle,
};
use crate::descriptor::{
    ArtifactDescriptorReader, ArtifactDescriptorRequest, ArtifactDescriptorResult,
    PomDescriptorReader,
};
use crate::error::ResolverError;
use crate::graph::{DependencyGraph, NodeId};
use crate::metadata_resolver::{DefaultMetadataResolver, MetadataRequest, MetadataResolver, MetadataResult};
use crate::range_resolver::{
    DefaultVersionRangeResolver, VersionRangeRequest, VersionRangeResolver, VersionRangeResult,
};
use crate::remote::RemoteRepositoryManager;
use crate::session::ResolutionSession;
use crate::version_resolver::{DefaultVersionResolver, VersionRequest, VersionResolver, VersionResult};

/// A collected graph whose artifacts were all resolved to files.
#[derive(Debug)]
pub struct DependencyResult {
    /// The graph, with every node's artifact carrying its file.
    pub graph: DependencyGraph,
    /// Results in pre-order of the nodes they belong to.
    pub artifact_results: Vec<ArtifactResult>,
    pub cycles: Vec<DependencyCycle>,
}

/// Resolution operations over one set of components.
pub struct RepositorySystem {
    metadata: Arc<dyn MetadataResolver>,
    versions: Arc<dyn VersionResolver>,
    ranges: Arc<dyn VersionRangeResolver>,
    artifacts: Arc<dyn ArtifactResolver>,
    descriptors: Arc<dyn ArtifactDescriptorReader>,
    collector: Arc<dyn DependencyCollector>,
}

impl RepositorySystem {
    /// The default components, transferring through `connectors`.
    pub fn new(connectors: Arc<dyn RepositoryConnectorProvider>) -> Self {
        let metadata: Arc<dyn MetadataResolver> =
            Arc::new(DefaultMetadataResolver::new(connectors.clone()));
        let versions: Arc<dyn VersionResolver> =
            Arc::new(DefaultVersionResolver::new(metadata.clone()));
        let ranges: Arc<dyn VersionRangeResolver> = Arc::new(DefaultVersionRangeResolver::new(
            metadata.clone(),
            versions.clone(),
        ));
        let artifacts: Arc<dyn ArtifactResolver> =
            Arc::new(DefaultArtifactResolver::new(connectors, versions.clone()));
        let descriptors: Arc<dyn ArtifactDescriptorReader> =
            Arc::new(PomDescriptorReader::new(artifacts.clone()));
        let collector: Arc<dyn DependencyCollector> = Arc::new(DefaultDependencyCollector::new(
            descriptors.clone(),
            ranges.clone(),
        ));
        Self {
            metadata,
            versions,
            ranges,
            artifacts,
            descriptors,
            collector,
        }
    }

    /// Read descriptors with `reader` instead of from POMs.
    pub fn with_descriptor_reader(mut self, reader: Arc<dyn ArtifactDescriptorReader>) -> Self {
        self.collector = Arc::new(DefaultDependencyCollector::new(
            reader.clone(),
            self.ranges.clone(),
        ));
        self.descriptors = reader;
        self
    }

    /// Repositories as configured by a user, with mirrors, proxies and
    /// credentials applied. Requests expect repositories in this form.
    pub fn new_resolution_repositories(
        &self,
        session: &ResolutionSession,
        repositories: &[RemoteRepository],
    ) -> Vec<RemoteRepository> {
        RemoteRepositoryManager::prepare(session, repositories)
    }

    pub async fn resolve_version(
        &self,
        session: &ResolutionSession,
        request: &VersionRequest,
    ) -> Result<VersionResult, ResolverError> {
        self.versions.resolve_version(session, request).await
    }

    pub async fn resolve_version_range(
        &self,
        session: &ResolutionSession,
        request: &VersionRangeRequest,
    ) -> Result<VersionRangeResult, ResolverError> {
        self.ranges.resolve_version_range(session, request).await
    }

    pub async fn read_artifact_descriptor(
        &self,
        session: &ResolutionSession,
        request: &ArtifactDescriptorRequest,
    ) -> Result<ArtifactDescriptorResult, ResolverError> {
        self.descriptors.read_descriptor(session, request).await
    }

    pub async fn collect_dependencies(
        &self,
        session: &ResolutionSession,
        request: CollectRequest,
    ) -> Result<CollectResult, ResolverError> {
        self.collector.collect_dependencies(session, request).await
    }

    /// Collect the graph of `request` and resolve the artifact of every node.
    ///
    /// Fails with [`ResolverError::DependencyCollection`] when collection met
    /// any problem, and with [`ResolverError::ArtifactResolution`] when any
    /// artifact stays unresolved. Both still carry what did resolve.
    pub async fn resolve_dependencies(
        &self,
        session: &ResolutionSession,
        request: CollectRequest,
    ) -> Result<DependencyResult, ResolverError> {
        let collected = self.collector.collect_dependencies(session, request).await?;
        let cycles = collected.cycles.clone();
        let mut graph = collected.into_result()?;

        let mut nodes: Vec<NodeId> = Vec::new();
        let mut requests = Vec::new();
        for id in graph.nodes() {
            let node = graph.node(id);
            if let Some(dependency) = &node.dependency {
                nodes.push(id);
                requests.push(ArtifactRequest::new(
                    dependency.artifact.clone(),
                    node.repositories.clone(),
                ));
            }
        }
        info!(artifacts = requests.len(), "resolving dependency artifacts");

        let (results, failed) = match self.artifacts.resolve_artifacts(session, requests).await {
            Ok(results) => (results, false),
            Err(ResolverError::ArtifactResolution { results }) => (results, true),
            Err(e) => return Err(e),
        };
        for (id, result) in nodes.into_iter().zip(&results) {
            if let Some(artifact) = &result.artifact {
                let node = graph.node_mut(id);
                node.dependency = node
                    .dependency
                    .as_ref()
                    .map(|d| d.with_artifact(artifact.clone()));
            }
        }

        if failed {
            return Err(ResolverError::ArtifactResolution { results });
        }
        Ok(DependencyResult {
            graph,
            artifact_results: results,
            cycles,
        })
    }

    pub async fn resolve_artifact(
        &self,
        session: &ResolutionSession,
        request: ArtifactRequest,
    ) -> Result<ArtifactResult, ResolverError> {
        self.artifacts.resolve_artifact(session, request).await
    }

    pub async fn resolve_artifacts(
        &self,
        session: &ResolutionSession,
        requests: Vec<ArtifactRequest>,
    ) -> Result<Vec<ArtifactResult>, ResolverError> {
        self.artifacts.resolve_artifacts(session, requests).await
    }

    pub async fn resolve_metadata(
        &self,
        session: &ResolutionSession,
        requests: Vec<MetadataRequest>,
    ) -> Vec<MetadataResult> {
        self.metadata.resolve_metadata(session, requests).await
    }
}
