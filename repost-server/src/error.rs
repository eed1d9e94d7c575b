//! API error handling module
//!
//! Provides a unified error type for all API endpoints with structured error variants.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use repost_core::{RepostError, StoreError};
use thiserror::Error;

/// API error type with structured variants for different error categories
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad request - client provided invalid input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not found - requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Engine error - from the detection library
    #[error("Engine error: {0}")]
    Repost(#[from] RepostError),
}

impl ApiError {
    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Repost(ref e) => match e {
                // Upstream and storage failures → 503
                RepostError::FingerprintTimeout(_)
                | RepostError::FingerprintUnavailable(_)
                | RepostError::StoreUnavailable(_)
                | RepostError::SchedulerStopped => StatusCode::SERVICE_UNAVAILABLE,

                // Client-provided invalid input → 400
                RepostError::InvalidItem(_) | RepostError::InvalidFingerprint(_) => {
                    StatusCode::BAD_REQUEST
                }

                // Image could not be decoded → 422
                RepostError::PerceptualHashError(_) => StatusCode::UNPROCESSABLE_ENTITY,

                RepostError::SchedulerInvariant(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Get the error code for programmatic error handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Repost(ref e) => match e {
                RepostError::FingerprintTimeout(_) => "FINGERPRINT_TIMEOUT",
                RepostError::FingerprintUnavailable(_) => "FINGERPRINT_UNAVAILABLE",
                RepostError::PerceptualHashError(_) => "PERCEPTUAL_HASH_ERROR",
                RepostError::InvalidFingerprint(_) => "INVALID_FINGERPRINT",
                RepostError::InvalidItem(_) => "INVALID_ITEM",
                RepostError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
                RepostError::SchedulerInvariant(_) => "SCHEDULER_HALTED",
                RepostError::SchedulerStopped => "SCHEDULER_STOPPED",
            },
        }
    }

    /// Get sanitized error message for client response
    fn client_message(&self) -> String {
        match self {
            // Store and scheduler internals stay in the logs
            Self::Repost(ref e) => match e {
                RepostError::StoreUnavailable(_) => "Record store unavailable".to_string(),
                RepostError::SchedulerInvariant(_) => "Intake scheduler halted".to_string(),
                RepostError::SchedulerStopped => "Intake scheduler is not running".to_string(),
                RepostError::FingerprintTimeout(_) | RepostError::FingerprintUnavailable(_) => {
                    "Fingerprint source unavailable".to_string()
                }
                RepostError::PerceptualHashError(_) => "Image could not be decoded".to_string(),
                RepostError::InvalidItem(_) | RepostError::InvalidFingerprint(_) => e.to_string(),
            },
            _ => self.to_string(),
        }
    }

    /// Get the error category for logging
    fn error_category(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Repost(_) => "engine",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Repost(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let category = self.error_category();
        let code = self.error_code();
        let internal_message = self.to_string();
        let client_message = self.client_message();

        // Log based on severity, always including internal details
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Server error"
            );
        } else {
            tracing::warn!(
                status = %status,
                category = category,
                code = code,
                error = %internal_message,
                "Client error"
            );
        }

        let body = serde_json::json!({
            "error": client_message,
            "code": code,
        });

        (status, Json(body)).into_response()
    }
}
