//! Engine configuration
//!
//! Loaded from environment variables with defaults; malformed values fall
//! back to the default rather than failing startup.

use std::time::Duration;

use url::Url;

use crate::fingerprint::FingerprintSourceConfig;
use crate::matcher::MatcherConfig;
use crate::scheduler::SchedulerConfig;

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// SQLite URL or path; in-memory store when `None`
    pub database_url: Option<String>,
    pub matcher: MatcherConfig,
    pub scheduler: SchedulerConfig,
    pub source: FingerprintSourceConfig,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl EngineConfig {
    /// Load configuration from environment variables
    ///
    /// - `DATABASE_URL`: SQLite URL or path
    /// - `REPOST_THRESHOLD` (default 5), `REPOST_SCORE_SCALE` (default 10)
    /// - `REPOST_FINGERPRINT_TIMEOUT_SECS` (default 30), `REPOST_COOLDOWN_MS` (default 2000)
    /// - `REPOST_PROXY_URL`: fallback download route
    /// - `REPOST_MOCK_FINGERPRINTS=true`: never fetch images
    /// - `REPOST_HTTP_TIMEOUT_SECS`: per-request HTTP timeout
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let matcher = MatcherConfig {
            threshold: env_parse("REPOST_THRESHOLD").unwrap_or(defaults.matcher.threshold),
            score_scale: env_parse("REPOST_SCORE_SCALE").unwrap_or(defaults.matcher.score_scale),
        };

        let proxy_url = std::env::var("REPOST_PROXY_URL").ok().and_then(|raw| {
            Url::parse(raw.trim())
                .map_err(|e| tracing::warn!(error = %e, "Ignoring malformed REPOST_PROXY_URL"))
                .ok()
        });

        let scheduler = SchedulerConfig {
            fingerprint_timeout: env_parse("REPOST_FINGERPRINT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.scheduler.fingerprint_timeout),
            cooldown: env_parse("REPOST_COOLDOWN_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.scheduler.cooldown),
            proxy_url,
            ..defaults.scheduler
        };

        let source = Self::source_from_env(defaults.source);

        Self {
            database_url,
            matcher,
            scheduler,
            source,
        }
    }

    #[cfg(all(feature = "network", feature = "perceptual-hash"))]
    fn source_from_env(default: FingerprintSourceConfig) -> FingerprintSourceConfig {
        use crate::fingerprint::HttpSourceConfig;

        if env_flag("REPOST_MOCK_FINGERPRINTS") {
            return FingerprintSourceConfig::Mock {
                seed: crate::fingerprint::DEFAULT_MOCK_SEED,
            };
        }
        match env_parse::<u64>("REPOST_HTTP_TIMEOUT_SECS") {
            Some(secs) => FingerprintSourceConfig::Http(HttpSourceConfig {
                timeout: Duration::from_secs(secs),
                ..Default::default()
            }),
            None => default,
        }
    }

    #[cfg(not(all(feature = "network", feature = "perceptual-hash")))]
    fn source_from_env(default: FingerprintSourceConfig) -> FingerprintSourceConfig {
        if env_flag("REPOST_MOCK_FINGERPRINTS") {
            tracing::debug!("Mock fingerprints are the only source in this build");
        }
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.database_url.is_none());
        assert_eq!(config.matcher.threshold, 5);
        assert_eq!(config.matcher.score_scale, 10);
        assert_eq!(config.scheduler.fingerprint_timeout, Duration::from_secs(30));
        assert_eq!(config.scheduler.cooldown, Duration::from_millis(2000));
        assert!(config.scheduler.proxy_url.is_none());
    }

    // Single test touching the environment so parallel tests cannot race.
    #[test]
    fn test_from_env() {
        std::env::set_var("REPOST_THRESHOLD", "8");
        std::env::set_var("REPOST_COOLDOWN_MS", "not-a-number");
        std::env::set_var("REPOST_PROXY_URL", "http://localhost:3000/api/download");
        std::env::set_var("REPOST_MOCK_FINGERPRINTS", "true");

        let config = EngineConfig::from_env();
        assert_eq!(config.matcher.threshold, 8);
        assert_eq!(config.scheduler.cooldown, Duration::from_millis(2000));
        assert_eq!(
            config.scheduler.proxy_url.as_ref().map(Url::as_str),
            Some("http://localhost:3000/api/download")
        );
        assert!(config.source.is_mock());

        std::env::remove_var("REPOST_THRESHOLD");
        std::env::remove_var("REPOST_COOLDOWN_MS");
        std::env::remove_var("REPOST_PROXY_URL");
        std::env::remove_var("REPOST_MOCK_FINGERPRINTS");
    }
}
