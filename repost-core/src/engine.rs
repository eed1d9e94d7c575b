//! Wiring of store, index, source and scheduler.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::fingerprint::{FingerprintSource, FingerprintSourceFactory};
use crate::index::DuplicateIndex;
use crate::scheduler::IntakeScheduler;
use crate::store::{open_store, RecordStore};

/// A running engine: the record store, the duplicate index over it, and
/// the scheduler feeding both.
pub struct Engine {
    pub store: Arc<dyn RecordStore>,
    pub index: Arc<DuplicateIndex>,
    pub scheduler: IntakeScheduler,
}

impl Engine {
    /// Open the configured store and source, then start the scheduler.
    pub async fn start(config: EngineConfig) -> Result<Self> {
        let store = open_store(config.database_url.as_deref()).await?;
        let source = FingerprintSourceFactory::create(config.source.clone())?;
        Ok(Self::with_parts(config, store, source))
    }

    /// Start with an explicit store and source.
    pub fn with_parts(
        config: EngineConfig,
        store: Arc<dyn RecordStore>,
        source: Arc<dyn FingerprintSource>,
    ) -> Self {
        let index = Arc::new(DuplicateIndex::new(store.clone(), config.matcher));
        let scheduler =
            IntakeScheduler::start(config.scheduler, store.clone(), index.clone(), source);
        Self {
            store,
            index,
            scheduler,
        }
    }

    /// Stop the scheduler, then close the store.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        self.store.close().await;
        tracing::info!(backend = %self.store.backend(), "Engine stopped");
    }
}
