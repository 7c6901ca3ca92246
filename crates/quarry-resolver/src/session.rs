//! Per-build resolution settings and shared state.

use std::fmt;
use std::sync::Arc;

use quarry_core::config::ResolverConfig;
use quarry_core::repository::{ChecksumPolicy, LocalRepository, RemoteRepository, UpdatePolicy};
use quarry_core::selector::{
    AuthenticationSelector, DefaultAuthenticationSelector, DefaultMirrorSelector,
    DefaultProxySelector, MirrorSelector, ProxySelector,
};
use quarry_maven::local::{manager_for, LocalRepositoryManager};
use quarry_maven::update::UpdateCheckManager;

use crate::cache::DataPool;
use crate::policy::{
    default_filter, DependencyFilter, DependencyManager, DependencyTraverser,
    FatArtifactTraverser, TransitiveManager,
};
use crate::workspace::WorkspaceReader;

const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// Everything an operation needs besides its request. Cloning is cheap and
/// clones share the data pool.
#[derive(Clone)]
pub struct ResolutionSession {
    pub offline: bool,
    pub local_repository_manager: Arc<dyn LocalRepositoryManager>,
    pub workspace_reader: Option<Arc<dyn WorkspaceReader>>,
    pub mirror_selector: Arc<dyn MirrorSelector>,
    pub proxy_selector: Arc<dyn ProxySelector>,
    pub authentication_selector: Arc<dyn AuthenticationSelector>,
    pub update_check_manager: UpdateCheckManager,
    /// Overrides the update policy of every repository when set.
    pub update_policy: Option<UpdatePolicy>,
    /// Overrides the checksum policy of every repository when set.
    pub checksum_policy: Option<ChecksumPolicy>,
    pub ignore_missing_descriptors: bool,
    pub ignore_invalid_descriptors: bool,
    pub ignore_descriptor_repositories: bool,
    pub max_concurrent_downloads: usize,
    pub dependency_filter: Arc<dyn DependencyFilter>,
    pub dependency_manager: Arc<dyn DependencyManager>,
    pub dependency_traverser: Arc<dyn DependencyTraverser>,
    pub data_pool: Arc<DataPool>,
}

impl ResolutionSession {
    /// The policy governing releases or snapshots of `repository`, with the
    /// session overrides applied.
    pub fn repository_policy(
        &self,
        repository: &RemoteRepository,
        snapshot: bool,
    ) -> (UpdatePolicy, ChecksumPolicy) {
        let policy = repository.policy(snapshot);
        (
            self.update_policy.unwrap_or(policy.update_policy),
            self.checksum_policy.unwrap_or(policy.checksum_policy),
        )
    }
}

impl fmt::Debug for ResolutionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionSession")
            .field("offline", &self.offline)
            .field(
                "local_repository",
                &self.local_repository_manager.repository().basedir(),
            )
            .field("update_policy", &self.update_policy)
            .field("checksum_policy", &self.checksum_policy)
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .finish_non_exhaustive()
    }
}

pub struct SessionBuilder {
    session: ResolutionSession,
}

impl SessionBuilder {
    pub fn new(local_repository: LocalRepository) -> Self {
        Self {
            session: ResolutionSession {
                offline: false,
                local_repository_manager: manager_for(local_repository),
                workspace_reader: None,
                mirror_selector: Arc::new(DefaultMirrorSelector::new()),
                proxy_selector: Arc::new(DefaultProxySelector::new()),
                authentication_selector: Arc::new(DefaultAuthenticationSelector::new()),
                update_check_manager: UpdateCheckManager::default(),
                update_policy: None,
                checksum_policy: None,
                ignore_missing_descriptors: false,
                ignore_invalid_descriptors: false,
                ignore_descriptor_repositories: false,
                max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
                dependency_filter: default_filter(),
                dependency_manager: Arc::new(TransitiveManager::default()),
                dependency_traverser: Arc::new(FatArtifactTraverser),
                data_pool: Arc::new(DataPool::new()),
            },
        }
    }

    /// Settings from a resolver configuration file.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut local = LocalRepository::new(&config.local_repository);
        local.content_type = config.local_layout.clone();
        Self::new(local)
            .offline(config.offline)
            .mirror_selector(Arc::new(config.mirror_selector()))
            .proxy_selector(Arc::new(config.proxy_selector()))
            .authentication_selector(Arc::new(config.authentication_selector()))
            .update_check_manager(UpdateCheckManager::new(
                config.cache_not_found,
                config.cache_transfer_errors,
            ))
            .update_policy(config.update_policy)
            .checksum_policy(config.checksum_policy)
            .ignore_missing_descriptors(config.ignore_missing_descriptors)
            .ignore_invalid_descriptors(config.ignore_invalid_descriptors)
            .ignore_descriptor_repositories(config.ignore_descriptor_repositories)
            .max_concurrent_downloads(config.max_concurrent_downloads)
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.session.offline = offline;
        self
    }

    pub fn local_repository_manager(mut self, manager: Arc<dyn LocalRepositoryManager>) -> Self {
        self.session.local_repository_manager = manager;
        self
    }

    pub fn workspace_reader(mut self, reader: Arc<dyn WorkspaceReader>) -> Self {
        self.session.workspace_reader = Some(reader);
        self
    }

    pub fn mirror_selector(mut self, selector: Arc<dyn MirrorSelector>) -> Self {
        self.session.mirror_selector = selector;
        self
    }

    pub fn proxy_selector(mut self, selector: Arc<dyn ProxySelector>) -> Self {
        self.session.proxy_selector = selector;
        self
    }

    pub fn authentication_selector(mut self, selector: Arc<dyn AuthenticationSelector>) -> Self {
        self.session.authentication_selector = selector;
        self
    }

    pub fn update_check_manager(mut self, manager: UpdateCheckManager) -> Self {
        self.session.update_check_manager = manager;
        self
    }

    pub fn update_policy(mut self, policy: Option<UpdatePolicy>) -> Self {
        self.session.update_policy = policy;
        self
    }

    pub fn checksum_policy(mut self, policy: Option<ChecksumPolicy>) -> Self {
        self.session.checksum_policy = policy;
        self
    }

    pub fn ignore_missing_descriptors(mut self, ignore: bool) -> Self {
        self.session.ignore_missing_descriptors = ignore;
        self
    }

    pub fn ignore_invalid_descriptors(mut self, ignore: bool) -> Self {
        self.session.ignore_invalid_descriptors = ignore;
        self
    }

    pub fn ignore_descriptor_repositories(mut self, ignore: bool) -> Self {
        self.session.ignore_descriptor_repositories = ignore;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn max_concurrent_downloads(mut self, max: usize) -> Self {
        self.session.max_concurrent_downloads = max.max(1);
        self
    }

    pub fn dependency_filter(mut self, filter: Arc<dyn DependencyFilter>) -> Self {
        self.session.dependency_filter = filter;
        self
    }

    pub fn dependency_manager(mut self, manager: Arc<dyn DependencyManager>) -> Self {
        self.session.dependency_manager = manager;
        self
    }

    pub fn dependency_traverser(mut self, traverser: Arc<dyn DependencyTraverser>) -> Self {
        self.session.dependency_traverser = traverser;
        self
    }

    pub fn build(self) -> ResolutionSession {
        self.session
    }
}
