//! Repost Core - near-duplicate image detection engine
//!
//! Given a stream of posts referencing images, this crate fingerprints each
//! image, persists the fingerprint, and reports every earlier sighting of
//! the same picture using approximate (Hamming distance) matching.
//!
//! # Components
//!
//! - [`store`]: durable identity → [`Record`] mapping (SQLite or memory)
//! - [`matcher`]: Hamming distance and threshold matching over a snapshot
//! - [`index`]: cached [`MatchResult`] per identity
//! - [`scheduler`]: single-flight, paced intake through a [`FingerprintSource`]
//! - [`intake`]: validated inbound items and feed adaptation
//!
//! # Example
//!
//! ```no_run
//! use repost_core::{Candidate, Engine, EngineConfig};
//!
//! # async fn example() -> repost_core::Result<()> {
//! let engine = Engine::start(EngineConfig::from_env()).await?;
//!
//! engine
//!     .scheduler
//!     .enqueue(vec![Candidate::new("t3_abc", "https://i.redd.it/abc.jpg")])
//!     .await?;
//! engine.scheduler.wait_until_idle().await?;
//!
//! if let Some(result) = engine.index.get_match("t3_abc").await? {
//!     println!("repost: {} ({} earlier)", result.is_duplicate, result.match_count);
//! }
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod intake;
pub mod matcher;
pub mod record;
pub mod scheduler;
pub mod store;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{RepostError, Result};
pub use fingerprint::{
    Fingerprint, FingerprintSource, FingerprintSourceConfig, FingerprintSourceFactory,
    MockFingerprintSource, SourceKind, DEFAULT_MOCK_SEED,
};
pub use index::DuplicateIndex;
pub use intake::{Candidate, FeedListing, FeedPost};
pub use matcher::{distance, find_matches, MatchResult, MatcherConfig, RecordMatch};
pub use record::Record;
pub use scheduler::{
    EnqueueSummary, IntakeEvent, IntakeScheduler, SchedulerConfig, SchedulerState,
    SchedulerStatus,
};
pub use store::{open_store, InsertOutcome, RecordSnapshot, RecordStore, StoreBackend, StoreError};

#[cfg(all(feature = "network", feature = "perceptual-hash"))]
pub use fingerprint::HttpFingerprintSource;

#[cfg(feature = "perceptual-hash")]
pub use fingerprint::PerceptualHasher;
