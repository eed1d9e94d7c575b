//! HTTP fingerprint source: fetch an image, hash it locally.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};

use super::{Fingerprint, FingerprintSource, PerceptualHasher, SourceKind};
use crate::error::{RepostError, Result};

/// Default maximum image size (25 MB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 25 * 1024 * 1024;

const IMAGE_ACCEPT: &str = "image/webp,image/apng,image/*,*/*;q=0.8";

/// Configuration for the HTTP fingerprint source.
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Per-request timeout. The scheduler imposes its own, longer bound.
    pub timeout: Duration,
    /// Bodies larger than this are rejected without hashing.
    pub max_image_bytes: usize,
    pub user_agent: String,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            user_agent: concat!("repost-radar/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fetches the content behind a locator and fingerprints it with
/// [`PerceptualHasher`].
pub struct HttpFingerprintSource {
    client: Client,
    config: HttpSourceConfig,
    hasher: PerceptualHasher,
}

impl HttpFingerprintSource {
    pub fn new() -> Result<Self> {
        Self::with_config(HttpSourceConfig::default())
    }

    #[instrument(level = "debug", skip_all, fields(timeout_ms = config.timeout.as_millis() as u64))]
    pub fn with_config(config: HttpSourceConfig) -> Result<Self> {
        debug!("Creating HTTP fingerprint client");
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                RepostError::FingerprintUnavailable(format!("Failed to create HTTP client: {e}"))
            })?;
        info!("HTTP fingerprint client created");
        Ok(Self {
            client,
            config,
            hasher: PerceptualHasher,
        })
    }

    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        let start = Instant::now();

        let response = self
            .client
            .get(locator)
            .header(USER_AGENT, &self.config.user_agent)
            .header(ACCEPT, IMAGE_ACCEPT)
            .send()
            .await
            .map_err(|e| {
                let latency_ms = start.elapsed().as_millis() as u64;
                warn!(error = %e, latency_ms, "Image request failed");
                RepostError::FingerprintUnavailable(format!("Image request failed: {e}"))
            })?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            let latency_ms = start.elapsed().as_millis() as u64;
            if is_throttling_status(status) {
                warn!(status = %status, latency_ms, "Image host is throttling");
            } else {
                warn!(status = %status, latency_ms, "Image host returned error status");
            }
            return Err(RepostError::FingerprintUnavailable(format!(
                "Image host returned status: {status}"
            )));
        }

        if let Some(len) = response.content_length() {
            self.check_size(len as usize)?;
        }

        let bytes = response.bytes().await.map_err(|e| {
            RepostError::FingerprintUnavailable(format!("Failed to read image body: {e}"))
        })?;
        self.check_size(bytes.len())?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            bytes = bytes.len(),
            "Image downloaded"
        );
        Ok(bytes.to_vec())
    }

    fn check_size(&self, len: usize) -> Result<()> {
        if len > self.config.max_image_bytes {
            return Err(RepostError::FingerprintUnavailable(format!(
                "Image too large: {len} bytes (max {})",
                self.config.max_image_bytes
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl FingerprintSource for HttpFingerprintSource {
    #[instrument(level = "info", skip(self), fields(source = "http"))]
    async fn fingerprint(&self, locator: &str) -> Result<Fingerprint> {
        let bytes = self.fetch(locator).await?;
        let hasher = self.hasher.clone();

        tokio::task::spawn_blocking(move || hasher.fingerprint_bytes(&bytes))
            .await
            .map_err(|e| RepostError::PerceptualHashError(format!("Hashing task failed: {e}")))?
    }

    fn source_id(&self) -> SourceKind {
        SourceKind::Http
    }
}

/// Statuses that indicate the image host is rate limiting or overloaded.
pub fn is_throttling_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
            | StatusCode::BAD_GATEWAY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpSourceConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.max_image_bytes, DEFAULT_MAX_IMAGE_BYTES);
        assert!(config.user_agent.starts_with("repost-radar/"));
    }

    #[test]
    fn test_create_client() {
        let source = HttpFingerprintSource::new().unwrap();
        assert_eq!(source.source_id(), SourceKind::Http);
    }

    #[test]
    fn test_size_limit() {
        let source = HttpFingerprintSource::with_config(HttpSourceConfig {
            max_image_bytes: 10,
            ..Default::default()
        })
        .unwrap();
        assert!(source.check_size(10).is_ok());
        assert!(matches!(
            source.check_size(11),
            Err(RepostError::FingerprintUnavailable(_))
        ));
    }

    #[test]
    fn test_throttling_status_codes() {
        assert!(is_throttling_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_throttling_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_throttling_status(StatusCode::NOT_FOUND));
        assert!(!is_throttling_status(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unavailable() {
        let source = HttpFingerprintSource::with_config(HttpSourceConfig {
            timeout: Duration::from_millis(500),
            ..Default::default()
        })
        .unwrap();
        let err = source.fingerprint("http://127.0.0.1:1/a.jpg").await.unwrap_err();
        assert!(matches!(err, RepostError::FingerprintUnavailable(_)));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_real_image() {
        let source = HttpFingerprintSource::new().unwrap();
        let fp = source
            .fingerprint("https://www.rust-lang.org/logos/rust-logo-256x256.png")
            .await
            .unwrap();
        assert_eq!(fp.len(), 64);
    }
}
