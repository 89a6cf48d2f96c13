//! The `Rapport` facade
//!
//! Bundles every concept over one storage backend so applications configure
//! storage once and hand a single value around.

use std::sync::Arc;
use tokio::runtime::Handle;

use crate::allocator::TimeBoxedAllocator;
use crate::config::RapportConfig;
use crate::deadlines::DeadlineTracker;
use crate::directory::StoreUserDirectory;
use crate::friendship::RelationshipEngine;
use crate::storage::{KeyedStore, StorageError, StoreFactory};
use crate::threads::ThreadTracker;
use crate::votes::VoteTracker;
use crate::Result;

/// All Rapport concepts sharing one storage backend
#[derive(Debug, Clone)]
pub struct Rapport {
    config: Arc<RapportConfig>,
    factory: StoreFactory,
    friendships: Arc<RelationshipEngine>,
    votes: VoteTracker,
    deadlines: DeadlineTracker,
    allocator: TimeBoxedAllocator,
    threads: Arc<ThreadTracker>,
    directory: StoreUserDirectory,
}

impl Rapport {
    /// Open the configured backend and build every concept over it.
    ///
    /// Allocations persisted by an earlier run get their release timers back.
    /// Release timers run on the current runtime.
    pub async fn new(config: RapportConfig) -> Result<Self> {
        Self::with_scheduler(config, Handle::current()).await
    }

    /// Like [`Rapport::new`], with release timers spawned on `scheduler`
    pub async fn with_scheduler(config: RapportConfig, scheduler: Handle) -> Result<Self> {
        crate::config::validate_config(&config)?;
        let factory = StoreFactory::from_config(&config.storage).await?;

        tracing::info!("Rapport starting with {} storage", factory.backend_name());

        let allocator = TimeBoxedAllocator::from_factory(&factory, &config.allocator, scheduler);
        allocator.rearm().await?;

        Ok(Self {
            friendships: Arc::new(RelationshipEngine::from_factory(&factory, &config.friendship)),
            votes: VoteTracker::from_factory(&factory),
            deadlines: DeadlineTracker::from_factory(&factory),
            allocator,
            threads: Arc::new(ThreadTracker::from_factory(&factory)),
            directory: StoreUserDirectory::from_factory(&factory),
            config: Arc::new(config),
            factory,
        })
    }

    pub fn friendships(&self) -> &RelationshipEngine {
        &self.friendships
    }

    pub fn votes(&self) -> &VoteTracker {
        &self.votes
    }

    pub fn deadlines(&self) -> &DeadlineTracker {
        &self.deadlines
    }

    pub fn allocator(&self) -> &TimeBoxedAllocator {
        &self.allocator
    }

    pub fn threads(&self) -> &ThreadTracker {
        &self.threads
    }

    pub fn directory(&self) -> &StoreUserDirectory {
        &self.directory
    }

    pub fn config(&self) -> &RapportConfig {
        &self.config
    }

    /// Name of the storage backend in use
    pub fn backend_name(&self) -> &'static str {
        self.factory.backend_name()
    }

    /// Check that the storage backend answers
    pub async fn health_check(&self) -> std::result::Result<bool, StorageError> {
        let probe: Arc<dyn KeyedStore<crate::directory::UserProfile>> = self.factory.store();
        probe.health_check().await
    }

    /// Cancel pending release timers. Allocations stay persisted and are
    /// re-armed by the next [`crate::init`].
    pub async fn shutdown(&self) {
        self.allocator.shutdown().await;
        tracing::info!("Rapport shut down");
    }
}
