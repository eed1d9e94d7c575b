//! Record listing handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use repost_core::Record;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

/// Default page size
const DEFAULT_LIMIT: usize = 100;

/// Maximum page size
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct RecordListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecordListResponse {
    /// Total records in the store
    pub count: usize,
    /// Requested page, ascending by `observed_at`
    pub records: Vec<Record>,
}

/// GET /records/{identity}
pub async fn get_record_handler(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<Record>, ApiError> {
    state
        .store()
        .get(&identity)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No record for identity '{}'", identity)))
}

/// GET /records - page through stored records
pub async fn list_records_handler(
    State(state): State<AppState>,
    Query(query): Query<RecordListQuery>,
) -> Result<Json<RecordListResponse>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let snapshot = state.store().all().await?;
    let records = snapshot.iter().skip(offset).take(limit).cloned().collect();

    Ok(Json(RecordListResponse {
        count: snapshot.len(),
        records,
    }))
}
