//! Content fingerprints and the sources that compute them.
//!
//! The engine treats fingerprinting as an external, rate-limited
//! collaborator: given a content locator it eventually yields a
//! fixed-length [`Fingerprint`] or fails. Everything here sits behind the
//! [`FingerprintSource`] trait so the scheduler never depends on how the
//! bytes are fetched or hashed.
//!
//! ## Sources
//!
//! - [`HttpFingerprintSource`] - fetches the image over HTTP and hashes it
//!   with Blockhash64 (requires the `network` and `perceptual-hash` features)
//! - [`MockFingerprintSource`] - deterministic, network-free source for tests
//!
//! ## Quick Start
//!
//! ```no_run
//! use repost_core::fingerprint::{FingerprintSource, MockFingerprintSource};
//!
//! # async fn example() -> repost_core::Result<()> {
//! let source = MockFingerprintSource::default();
//! let fingerprint = source.fingerprint("https://i.redd.it/abc.jpg").await?;
//! assert_eq!(fingerprint.len(), 64);
//! # Ok(())
//! # }
//! ```

#[cfg(all(feature = "network", feature = "perceptual-hash"))]
mod http;
mod mock;
#[cfg(feature = "perceptual-hash")]
pub mod perceptual;
mod provider;

#[cfg(all(feature = "network", feature = "perceptual-hash"))]
pub use http::{HttpFingerprintSource, HttpSourceConfig};
pub use mock::{MockFingerprintSource, DEFAULT_MOCK_SEED};
#[cfg(feature = "perceptual-hash")]
pub use perceptual::PerceptualHasher;
pub use provider::{FingerprintSourceConfig, FingerprintSourceFactory};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{RepostError, Result};

/// An opaque, fixed-length content signature.
///
/// Conventionally a string of `'0'`/`'1'` symbols. All fingerprints in one
/// store generation share the same length; comparing fingerprints of
/// different lengths is well defined (see [`crate::matcher::distance`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a symbol string. The empty string is not a fingerprint.
    pub fn parse(symbols: impl Into<String>) -> Result<Self> {
        let symbols = symbols.into();
        if symbols.is_empty() {
            return Err(RepostError::InvalidFingerprint(
                "fingerprint must contain at least one symbol".into(),
            ));
        }
        Ok(Self(symbols))
    }

    /// Render raw hash bytes as a bit string, most significant bit first.
    pub fn from_bits(bytes: &[u8]) -> Result<Self> {
        let symbols: String = bytes
            .iter()
            .flat_map(|byte| (0..8).rev().map(move |bit| (byte >> bit) & 1))
            .map(|bit| if bit == 1 { '1' } else { '0' })
            .collect();
        Self::parse(symbols)
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = RepostError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for fingerprint sources.
///
/// Implementations must be thread-safe (`Send + Sync`) and idempotent:
/// the same content must always produce the same fingerprint. Latency is
/// bounded by the caller, which wraps every call in a timeout.
#[async_trait]
pub trait FingerprintSource: Send + Sync {
    /// Compute the fingerprint of the content behind `locator`.
    async fn fingerprint(&self, locator: &str) -> Result<Fingerprint>;

    /// Identifies the source in logs and status output.
    fn source_id(&self) -> SourceKind;
}

/// Identifies which fingerprint source produced a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Image fetched over HTTP and hashed locally
    Http,
    /// Deterministic mock (testing only)
    Mock,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "HTTP perceptual hash"),
            Self::Mock => write!(f, "Mock (deterministic)"),
        }
    }
}
