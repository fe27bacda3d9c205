use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use tracing::{error, info};

use appdeck_types::api::SweepResponse;
use appdeck_types::models::RETENTION_DAYS;
use appdeck_types::time;

use crate::auth::AppState;
use crate::error::ApiError;

/// The external scheduler identifies itself through its user-agent.
pub const SCHEDULER_UA_MARKER: &str = "appdeck-cron";

/// Rows deleted per committed batch during a sweep.
const PURGE_BATCH_SIZE: usize = 500;

/// Scheduled retention sweep: permanently removes comments soft-deleted more
/// than the retention window ago. Both guards run before any deletion.
pub async fn run_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    check_sweep_headers(
        headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok()),
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok()),
        &state.sweep_token,
    )?;

    let cutoff = time::format(Utc::now() - Duration::days(RETENTION_DAYS));
    let db = state.clone();
    let deleted = tokio::task::spawn_blocking(move || {
        db.db.purge_expired_comments(&cutoff, PURGE_BATCH_SIZE)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    if deleted > 0 {
        info!("Retention sweep removed {} comments", deleted);
    }

    Ok(Json(SweepResponse {
        success: true,
        deleted,
    }))
}

/// 403 when the caller is not the scheduler, 401 when the bearer token is
/// missing or wrong. No deletion happens on either failure.
fn check_sweep_headers(
    user_agent: Option<&str>,
    authorization: Option<&str>,
    expected_token: &str,
) -> Result<(), ApiError> {
    let ua = user_agent.unwrap_or("");
    if !ua.contains(SCHEDULER_UA_MARKER) {
        return Err(ApiError::Forbidden("unrecognized caller".into()));
    }

    let token = authorization
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".into()))?;
    if token != expected_token {
        return Err(ApiError::Unauthorized("invalid sweep token".into()));
    }

    Ok(())
}
