//! Fingerprint source selection.
//!
//! ## Supported Sources
//!
//! - `HttpFingerprintSource` - fetch over HTTP and Blockhash64 (production)
//! - `MockFingerprintSource` - deterministic mock (testing only)

use std::sync::Arc;

#[cfg(all(feature = "network", feature = "perceptual-hash"))]
use super::{HttpFingerprintSource, HttpSourceConfig};
use super::{FingerprintSource, MockFingerprintSource};
use crate::error::Result;

/// Configuration for creating fingerprint sources.
#[derive(Debug, Clone)]
pub enum FingerprintSourceConfig {
    #[cfg(all(feature = "network", feature = "perceptual-hash"))]
    Http(HttpSourceConfig),

    /// Mock source (testing only)
    Mock { seed: u64 },
}

impl Default for FingerprintSourceConfig {
    #[cfg(all(feature = "network", feature = "perceptual-hash"))]
    fn default() -> Self {
        Self::Http(HttpSourceConfig::default())
    }

    #[cfg(not(all(feature = "network", feature = "perceptual-hash")))]
    fn default() -> Self {
        Self::Mock {
            seed: super::DEFAULT_MOCK_SEED,
        }
    }
}

impl FingerprintSourceConfig {
    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock { .. })
    }
}

/// Factory for creating fingerprint sources.
pub struct FingerprintSourceFactory;

impl FingerprintSourceFactory {
    pub fn create(config: FingerprintSourceConfig) -> Result<Arc<dyn FingerprintSource>> {
        match config {
            #[cfg(all(feature = "network", feature = "perceptual-hash"))]
            FingerprintSourceConfig::Http(http_config) => {
                let source = HttpFingerprintSource::with_config(http_config)?;
                Ok(Arc::new(source))
            }
            FingerprintSourceConfig::Mock { seed } => {
                tracing::warn!("Using mock fingerprint source; no images will be fetched");
                Ok(Arc::new(MockFingerprintSource::new(seed)))
            }
        }
    }

    /// Create a mock source for testing.
    pub fn create_mock() -> Arc<dyn FingerprintSource> {
        Arc::new(MockFingerprintSource::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::SourceKind;

    #[test]
    fn test_create_mock() {
        let source = FingerprintSourceFactory::create(FingerprintSourceConfig::Mock { seed: 7 })
            .unwrap();
        assert_eq!(source.source_id(), SourceKind::Mock);
    }

    #[cfg(all(feature = "network", feature = "perceptual-hash"))]
    #[test]
    fn test_default_is_http() {
        let config = FingerprintSourceConfig::default();
        assert!(!config.is_mock());
        let source = FingerprintSourceFactory::create(config).unwrap();
        assert_eq!(source.source_id(), SourceKind::Http);
    }
}
