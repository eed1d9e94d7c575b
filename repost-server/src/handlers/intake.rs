//! Intake handlers
//!
//! Accepts batches of posts for fingerprinting and exposes the scheduler's
//! queue. Fingerprinting happens in the background; match results are read
//! back through `/matches/{identity}`.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use repost_core::{Candidate, EnqueueSummary, FeedPost, SchedulerStatus};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

/// Batch submitted to `POST /intake`.
///
/// `items` are already-normalized candidates; `posts` are raw feed entries
/// adapted on the way in. Both may be given in the same request.
#[derive(Debug, Default, Deserialize)]
pub struct IntakeRequest {
    #[serde(default)]
    pub items: Vec<Candidate>,
    #[serde(default)]
    pub posts: Vec<FeedPost>,
}

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    #[serde(flatten)]
    pub summary: EnqueueSummary,
    /// Feed posts without an image (self posts, missing URL)
    pub ignored: usize,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub discarded: usize,
}

/// POST /intake - queue a batch for fingerprinting
pub async fn intake_handler(
    State(state): State<AppState>,
    payload: Result<Json<IntakeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IntakeResponse>), ApiError> {
    let Json(request) = payload?;

    if request.items.is_empty() && request.posts.is_empty() {
        return Err(ApiError::bad_request(
            "Either 'items' or 'posts' must contain at least one entry",
        ));
    }

    let mut batch = request.items;
    let mut ignored = 0;
    for post in &request.posts {
        match post.to_candidate() {
            Some(candidate) => batch.push(candidate),
            None => ignored += 1,
        }
    }

    let summary = if batch.is_empty() {
        EnqueueSummary::default()
    } else {
        state.scheduler().enqueue(batch).await?
    };

    tracing::info!(
        accepted = summary.accepted,
        already_queued = summary.already_queued,
        already_recorded = summary.already_recorded,
        ignored,
        "Intake batch queued"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(IntakeResponse { summary, ignored }),
    ))
}

/// DELETE /intake/pending - discard everything not yet in flight
pub async fn cancel_pending_handler(
    State(state): State<AppState>,
) -> Result<Json<CancelResponse>, ApiError> {
    let discarded = state.scheduler().cancel_pending()?;
    tracing::info!(discarded, "Pending intake cancelled");
    Ok(Json(CancelResponse { discarded }))
}

/// GET /intake/status - scheduler state and counters
pub async fn intake_status_handler(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler().status())
}
