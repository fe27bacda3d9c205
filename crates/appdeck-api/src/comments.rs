use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use appdeck_db::models::{CommentMetaRow, CommentRow, DeletedCommentRow};
use appdeck_types::api::{
    Claims, CommentResponse, CreateCommentRequest, DeletedCommentResponse, ModerateCommentRequest,
};
use appdeck_types::models::{DeleteReason, Deleter, days_remaining};
use appdeck_types::page::{Cursor, DEFAULT_COMMENT_PAGE_SIZE, Page, paginate};
use appdeck_types::{time, validate};

use crate::apps::{PageQuery, page_params, parse_ts, parse_uuid};
use crate::auth::AppState;
use crate::error::ApiError;

/// Active comments for an app, newest first, cursor-paginated.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, cursor) = page_params(&query, DEFAULT_COMMENT_PAGE_SIZE)?;

    let app = state
        .db
        .get_app_by_slug(&slug)?
        .ok_or_else(|| ApiError::NotFound("app not found".into()))?;

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || {
        db.db.list_active_comments(&app.id, limit + 1, cursor.as_ref())
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    let page = paginate(rows, limit as usize, |row| Cursor {
        created_at: row.created_at.clone(),
        id: row.id.clone(),
    });

    Ok(Json(Page {
        items: page
            .items
            .into_iter()
            .map(comment_response)
            .collect::<Vec<_>>(),
        next_cursor: page.next_cursor,
    }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::validate_comment_body(&req.body).map_err(ApiError::Validation)?;

    let app = state
        .db
        .get_app_by_slug(&slug)?
        .ok_or_else(|| ApiError::NotFound("app not found".into()))?;

    let id = Uuid::new_v4();
    let now = time::now();
    state
        .db
        .insert_comment(&id.to_string(), &app.id, &claims.sub.to_string(), &req.body, &now)?;

    Ok((
        StatusCode::CREATED,
        Json(CommentResponse {
            id,
            app_id: parse_uuid(&app.id, "app id"),
            author_id: claims.sub,
            author_username: claims.username,
            body: req.body,
            created_at: parse_ts(&now, "created_at"),
        }),
    ))
}

/// Self-deletion: an author removing their own comment needs no reason.
pub async fn delete_own_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let meta = state
        .db
        .get_comment_meta(&comment_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("comment not found".into()))?;

    authorize_self_delete(&meta, claims.sub)?;

    soft_delete(&state, &meta.id, Deleter::Author, None, claims.sub)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Owner-deletion: the app owner moderating a comment must supply a reason
/// from the fixed set.
pub async fn moderate_comment(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ModerateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let meta = state
        .db
        .get_comment_meta(&comment_id.to_string())?
        .ok_or_else(|| ApiError::NotFound("comment not found".into()))?;

    authorize_owner_delete(&meta, claims.sub)?;
    let reason = required_reason(&req)?;

    soft_delete(&state, &meta.id, Deleter::AppOwner, Some(reason), claims.sub)?;
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own soft-deleted comments, with the purge countdown.
pub async fn my_deleted_comments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .db
        .list_deleted_comments_by_author(&claims.sub.to_string())?;
    Ok(Json(deleted_responses(rows)))
}

/// Soft-deleted comments across one app, visible to its owner only.
pub async fn app_deleted_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let app = state
        .db
        .get_app_by_slug(&slug)?
        .ok_or_else(|| ApiError::NotFound("app not found".into()))?;

    if app.owner_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden(
            "only the app owner may view its deleted comments".into(),
        ));
    }

    let rows = state.db.list_deleted_comments_for_app(&app.id)?;
    Ok(Json(deleted_responses(rows)))
}

/// Owner-deletion carries no default: the reason must be present and drawn
/// from the fixed set, or the request fails before any mutation.
fn required_reason(req: &ModerateCommentRequest) -> Result<DeleteReason, ApiError> {
    let reason = req
        .reason
        .as_deref()
        .ok_or_else(|| ApiError::Validation("a deletion reason is required".into()))?;
    DeleteReason::parse(reason)
        .ok_or_else(|| ApiError::Validation(format!("unknown deletion reason '{reason}'")))
}

fn authorize_self_delete(meta: &CommentMetaRow, actor: Uuid) -> Result<(), ApiError> {
    if meta.deleter.is_some() {
        return Err(ApiError::Conflict("comment is already deleted".into()));
    }
    if meta.author_id != actor.to_string() {
        return Err(ApiError::Forbidden(
            "only the author may delete this comment".into(),
        ));
    }
    Ok(())
}

fn authorize_owner_delete(meta: &CommentMetaRow, actor: Uuid) -> Result<(), ApiError> {
    if meta.deleter.is_some() {
        return Err(ApiError::Conflict("comment is already deleted".into()));
    }
    if meta.app_owner_id != actor.to_string() {
        return Err(ApiError::Forbidden(
            "only the app owner may moderate this comment".into(),
        ));
    }
    Ok(())
}

fn soft_delete(
    state: &AppState,
    comment_id: &str,
    deleter: Deleter,
    reason: Option<DeleteReason>,
    actor: Uuid,
) -> Result<(), ApiError> {
    let changed = state.db.soft_delete_comment(
        comment_id,
        deleter.as_str(),
        reason.map(DeleteReason::as_str),
        &actor.to_string(),
        &time::now(),
    )?;

    // The meta check above can race with another delete; the guarded UPDATE
    // is what actually decides.
    if !changed {
        return Err(ApiError::Conflict("comment is already deleted".into()));
    }
    Ok(())
}

fn comment_response(row: CommentRow) -> CommentResponse {
    CommentResponse {
        id: parse_uuid(&row.id, "comment id"),
        app_id: parse_uuid(&row.app_id, "app id"),
        author_id: parse_uuid(&row.author_id, "author id"),
        author_username: row.author_username,
        body: row.body,
        created_at: parse_ts(&row.created_at, "created_at"),
    }
}

fn deleted_responses(rows: Vec<DeletedCommentRow>) -> Vec<DeletedCommentResponse> {
    let now = Utc::now();
    rows.into_iter()
        .map(|row| {
            let deleted_at = parse_ts(&row.deleted_at, "deleted_at");
            let deleter = Deleter::parse(&row.deleter).unwrap_or_else(|| {
                warn!("Corrupt deleter '{}' on comment '{}'", row.deleter, row.id);
                Deleter::Author
            });
            DeletedCommentResponse {
                id: parse_uuid(&row.id, "comment id"),
                app_id: parse_uuid(&row.app_id, "app id"),
                author_id: parse_uuid(&row.author_id, "author id"),
                body: row.body,
                deleter,
                delete_reason: row.delete_reason.as_deref().and_then(DeleteReason::parse),
                deleted_by_user_id: row
                    .deleted_by_user_id
                    .as_deref()
                    .and_then(|id| id.parse().ok()),
                deleted_at,
                days_remaining: days_remaining(deleted_at, now),
                created_at: parse_ts(&row.created_at, "created_at"),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(author: Uuid, owner: Uuid, deleter: Option<&str>) -> CommentMetaRow {
        CommentMetaRow {
            id: Uuid::new_v4().to_string(),
            app_id: Uuid::new_v4().to_string(),
            author_id: author.to_string(),
            app_owner_id: owner.to_string(),
            deleter: deleter.map(str::to_string),
        }
    }

    #[test]
    fn test_self_delete_requires_authorship() {
        let author = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let meta = meta(author, owner, None);

        assert!(authorize_self_delete(&meta, author).is_ok());
        assert!(matches!(
            authorize_self_delete(&meta, stranger),
            Err(ApiError::Forbidden(_))
        ));
        // Owning the app does not grant the self-delete path
        assert!(matches!(
            authorize_self_delete(&meta, owner),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_owner_delete_requires_app_ownership() {
        let author = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let meta = meta(author, owner, None);

        assert!(authorize_owner_delete(&meta, owner).is_ok());
        assert!(matches!(
            authorize_owner_delete(&meta, author),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn test_double_delete_is_conflict() {
        let author = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let meta = meta(author, owner, Some("author"));

        assert!(matches!(
            authorize_self_delete(&meta, author),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            authorize_owner_delete(&meta, owner),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn test_moderation_requires_a_reason_from_the_fixed_set() {
        assert!(matches!(
            required_reason(&ModerateCommentRequest { reason: None }),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            required_reason(&ModerateCommentRequest {
                reason: Some("rude".into())
            }),
            Err(ApiError::Validation(_))
        ));
        assert_eq!(
            required_reason(&ModerateCommentRequest {
                reason: Some("spam".into())
            })
            .unwrap(),
            DeleteReason::Spam
        );
    }

    #[test]
    fn test_deleted_response_carries_countdown() {
        let now = Utc::now();
        let rows = vec![DeletedCommentRow {
            id: Uuid::new_v4().to_string(),
            app_id: Uuid::new_v4().to_string(),
            author_id: Uuid::new_v4().to_string(),
            body: "gone but not forgotten".into(),
            deleter: "appOwner".into(),
            delete_reason: Some("spam".into()),
            deleted_by_user_id: None,
            deleted_at: time::format(now - chrono::Duration::days(10)),
            created_at: time::format(now - chrono::Duration::days(11)),
        }];

        let out = deleted_responses(rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].deleter, Deleter::AppOwner);
        assert_eq!(out[0].delete_reason, Some(DeleteReason::Spam));
        assert_eq!(out[0].days_remaining, 20);
    }
}
