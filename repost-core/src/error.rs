use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum RepostError {
    #[error("Fingerprint source timed out after {}ms", .0.as_millis())]
    FingerprintTimeout(Duration),

    #[error("Fingerprint unavailable: {0}")]
    FingerprintUnavailable(String),

    #[error("Perceptual hash error: {0}")]
    PerceptualHashError(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Invalid intake item: {0}")]
    InvalidItem(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Scheduler invariant violated: {0}")]
    SchedulerInvariant(String),

    #[error("Scheduler is not running")]
    SchedulerStopped,
}

pub type Result<T> = std::result::Result<T, RepostError>;
