use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use appdeck_types::api::{Claims, ToggleUpvoteResponse};
use appdeck_types::time;

use crate::auth::AppState;
use crate::error::ApiError;

/// Flips the caller's upvote on an app. Toggling twice returns to the
/// starting state; the flip itself is transactional in the DB layer.
pub async fn toggle_upvote(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state
        .db
        .get_app_by_slug(&slug)?
        .ok_or_else(|| ApiError::NotFound("app not found".into()))?;

    let added = state
        .db
        .toggle_upvote(&claims.sub.to_string(), &app.id, &time::now())?;

    Ok(Json(ToggleUpvoteResponse {
        success: true,
        action: if added { "added" } else { "removed" },
    }))
}
