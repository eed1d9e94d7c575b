//! Duplicate index: cached match results per identity.
//!
//! The index is a derived view over the record store and can be thrown
//! away and rebuilt at any time. It is updated incrementally: when a record
//! is inserted, only that record's result is computed. Results cached for
//! older records are left as they were, so an older record's `match_count`
//! reflects the matches known when it was last computed. Call
//! [`DuplicateIndex::refresh`] or [`DuplicateIndex::rebuild`] to bring
//! them up to date.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::matcher::{MatchResult, MatcherConfig};
use crate::record::Record;
use crate::store::RecordStore;

pub struct DuplicateIndex {
    store: Arc<dyn RecordStore>,
    config: MatcherConfig,
    results: DashMap<String, MatchResult>,
}

impl DuplicateIndex {
    pub fn new(store: Arc<dyn RecordStore>, config: MatcherConfig) -> Self {
        Self {
            store,
            config,
            results: DashMap::new(),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Compute and cache the result for a record that was just inserted.
    #[instrument(level = "debug", skip_all, fields(identity = %record.identity))]
    pub async fn record_inserted(&self, record: &Record) -> Result<MatchResult> {
        let snapshot = self.store.all().await?;
        let result = MatchResult::compute(record, &snapshot, &self.config);
        debug!(
            match_count = result.match_count,
            is_duplicate = result.is_duplicate,
            "Indexed record"
        );
        self.results.insert(record.identity.clone(), result.clone());
        Ok(result)
    }

    /// The match result for `identity`, or `None` if it was never inserted.
    ///
    /// On a cache miss (e.g. after a restart) the result is computed against
    /// the current store contents and cached.
    pub async fn get_match(&self, identity: &str) -> Result<Option<MatchResult>> {
        if let Some(result) = self.cached(identity) {
            return Ok(Some(result));
        }
        self.refresh(identity).await
    }

    /// Recompute one identity against the current store contents.
    pub async fn refresh(&self, identity: &str) -> Result<Option<MatchResult>> {
        let snapshot = self.store.all().await?;
        let Some(record) = snapshot.get(identity) else {
            self.results.remove(identity);
            return Ok(None);
        };

        let result = MatchResult::compute(record, &snapshot, &self.config);
        self.results.insert(identity.to_string(), result.clone());
        Ok(Some(result))
    }

    /// Recompute every record from one snapshot. Returns the number of
    /// results now cached.
    #[instrument(level = "info", skip(self))]
    pub async fn rebuild(&self) -> Result<usize> {
        let snapshot = self.store.all().await?;
        let fresh: Vec<(String, MatchResult)> = snapshot
            .iter()
            .map(|record| {
                (
                    record.identity.clone(),
                    MatchResult::compute(record, &snapshot, &self.config),
                )
            })
            .collect();

        self.results.clear();
        for (identity, result) in fresh {
            self.results.insert(identity, result);
        }
        info!(records = self.results.len(), "Duplicate index rebuilt");
        Ok(self.results.len())
    }

    /// Cached result only; never touches the store.
    pub fn cached(&self, identity: &str) -> Option<MatchResult> {
        self.results.get(identity).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
