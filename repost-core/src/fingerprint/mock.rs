//! Mock fingerprint source for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha3::{Digest, Sha3_256};

use super::{Fingerprint, FingerprintSource, SourceKind};
use crate::error::{RepostError, Result};

/// Seed used by [`MockFingerprintSource::default`] and the mock source
/// configuration, stable so a persisted store stays consistent.
pub const DEFAULT_MOCK_SEED: u64 = 0xDEADBEEF_CAFEBABE;

/// Deterministic, network-free fingerprint source.
///
/// Locators with a preset fingerprint return it; registered failures are
/// returned as `FingerprintUnavailable`; anything else gets a 64-bit
/// fingerprint derived from SHA3 of the seed and the locator, so identical
/// locators always collide and distinct ones almost never do.
///
/// WARNING: Do not use in production - no image is ever fetched!
#[derive(Clone)]
pub struct MockFingerprintSource {
    seed: u64,
    presets: Arc<Mutex<HashMap<String, Fingerprint>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFingerprintSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            presets: Arc::default(),
            failures: Arc::default(),
            calls: Arc::default(),
        }
    }

    /// Always answer `locator` with `fingerprint`.
    pub fn with_preset(self, locator: impl Into<String>, fingerprint: Fingerprint) -> Self {
        if let Ok(mut presets) = self.presets.lock() {
            presets.insert(locator.into(), fingerprint);
        }
        self
    }

    /// Always fail for `locator`.
    pub fn with_failure(self, locator: impl Into<String>, reason: impl Into<String>) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(locator.into(), reason.into());
        }
        self
    }

    /// Locators requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Derive the fingerprint for a locator without recording a call.
    pub fn fingerprint_sync(&self, locator: &str) -> Result<Fingerprint> {
        if let Some(reason) = self.lookup(&self.failures, locator) {
            return Err(RepostError::FingerprintUnavailable(reason));
        }
        if let Some(preset) = self.lookup(&self.presets, locator) {
            return Ok(preset);
        }

        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(b"repost-mock-fingerprint");
        hasher.update(locator.as_bytes());

        let digest = hasher.finalize();
        Fingerprint::from_bits(&digest[..8])
    }

    fn lookup<V: Clone>(&self, map: &Mutex<HashMap<String, V>>, locator: &str) -> Option<V> {
        map.lock().ok().and_then(|m| m.get(locator).cloned())
    }
}

impl Default for MockFingerprintSource {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_SEED)
    }
}

#[async_trait]
impl FingerprintSource for MockFingerprintSource {
    async fn fingerprint(&self, locator: &str) -> Result<Fingerprint> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(locator.to_string());
        }
        self.fingerprint_sync(locator)
    }

    fn source_id(&self) -> SourceKind {
        SourceKind::Mock
    }
}
