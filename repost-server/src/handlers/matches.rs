//! Match lookup handlers

use axum::{
    extract::{Path, State},
    Json,
};
use repost_core::MatchResult;
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub identity: String,
    #[serde(flatten)]
    pub result: MatchResult,
}

/// GET /matches/{identity} - duplicate status of a recorded item
///
/// Serves the cached result when there is one, which may predate later
/// insertions; use the refresh endpoint to recompute.
pub async fn get_match_handler(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<MatchResponse>, ApiError> {
    let result = state
        .index()
        .get_match(&identity)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No record for identity '{}'", identity)))?;

    Ok(Json(MatchResponse { identity, result }))
}

/// POST /matches/{identity}/refresh - recompute against the current store
pub async fn refresh_match_handler(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<MatchResponse>, ApiError> {
    let result = state
        .index()
        .refresh(&identity)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("No record for identity '{}'", identity)))?;

    Ok(Json(MatchResponse { identity, result }))
}
