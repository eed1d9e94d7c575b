//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod health;
pub mod intake;
pub mod matches;
pub mod records;

pub use crate::state::AppState;
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use intake::{
    cancel_pending_handler, intake_handler, intake_status_handler, CancelResponse, IntakeRequest,
    IntakeResponse,
};
pub use matches::{get_match_handler, refresh_match_handler, MatchResponse};
pub use records::{get_record_handler, list_records_handler, RecordListQuery, RecordListResponse};
