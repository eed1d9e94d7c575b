//! Exit codes following sysexits.h conventions.
//!
//! These codes provide semantic meaning for different failure modes,
//! enabling scripts and CI systems to handle errors appropriately.

use repost_core::RepostError;

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// Data format error (input file is not a batch of posts).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Cannot open input file, or the requested record does not exist.
/// Maps to EX_NOINPUT from sysexits.h.
pub const INPUT_ERROR: i32 = 66;

/// Service unavailable (fingerprint source, scheduler).
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// I/O error (record store cannot be opened or written).
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;

/// Represents an exit code with optional error context.
pub struct ExitCode {
    pub code: i32,
    pub message: Option<String>,
}

impl ExitCode {
    pub const fn success() -> Self {
        Self {
            code: SUCCESS,
            message: None,
        }
    }

    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        // Engine errors carry their own classification
        let engine_code = err
            .chain()
            .find_map(|e| e.downcast_ref::<RepostError>())
            .map(|e| match e {
                RepostError::StoreUnavailable(_) => IO_ERROR,
                RepostError::InvalidItem(_) | RepostError::InvalidFingerprint(_) => DATA_ERROR,
                RepostError::FingerprintTimeout(_)
                | RepostError::FingerprintUnavailable(_)
                | RepostError::PerceptualHashError(_)
                | RepostError::SchedulerInvariant(_)
                | RepostError::SchedulerStopped => UNAVAILABLE,
            });

        let code = engine_code.unwrap_or_else(|| {
            if message.contains("Failed to read") || message.contains("No record for identity") {
                INPUT_ERROR
            } else if message.contains("Failed to parse") {
                DATA_ERROR
            } else if message.contains("could be fingerprinted") {
                UNAVAILABLE
            } else if message.contains("Failed to write") {
                IO_ERROR
            } else {
                GENERAL_ERROR
            }
        });

        Self {
            code,
            message: Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};
    use repost_core::StoreError;

    #[test]
    fn test_classifies_engine_errors_through_context() {
        let err = Err::<(), _>(RepostError::StoreUnavailable(StoreError::Connection(
            "unable to open database file".into(),
        )))
        .context("Failed to start engine")
        .unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err).code, IO_ERROR);
    }

    #[test]
    fn test_classifies_by_message() {
        assert_eq!(
            ExitCode::from_anyhow(&anyhow!("Failed to read input file: posts.json")).code,
            INPUT_ERROR
        );
        assert_eq!(
            ExitCode::from_anyhow(&anyhow!("No record for identity 't3_x'")).code,
            INPUT_ERROR
        );
        assert_eq!(
            ExitCode::from_anyhow(&anyhow!("Failed to parse items")).code,
            DATA_ERROR
        );
        assert_eq!(ExitCode::from_anyhow(&anyhow!("boom")).code, GENERAL_ERROR);
    }
}
