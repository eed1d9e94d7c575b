//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use repost_core::{DuplicateIndex, Engine, IntakeScheduler, RecordStore};

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Running engine: store, duplicate index and intake scheduler
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.engine.store
    }

    pub fn index(&self) -> &DuplicateIndex {
        &self.engine.index
    }

    pub fn scheduler(&self) -> &IntakeScheduler {
        &self.engine.scheduler
    }
}
