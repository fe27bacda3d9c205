use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, warn};
use uuid::Uuid;

use appdeck_db::models::{AppChanges, AppRow, NewApp};
use appdeck_types::api::{AppResponse, Claims, CreateAppRequest, UpdateAppRequest};
use appdeck_types::models::PublishStatus;
use appdeck_types::page::{Cursor, DEFAULT_APP_PAGE_SIZE, MAX_PAGE_SIZE, Page, paginate};
use appdeck_types::{time, validate};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::maybe_claims;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

pub(crate) fn page_params(
    query: &PageQuery,
    default_limit: u32,
) -> Result<(u32, Option<Cursor>), ApiError> {
    let limit = query.limit.unwrap_or(default_limit).clamp(1, MAX_PAGE_SIZE);
    let cursor = match query.cursor.as_deref() {
        Some(token) => Some(
            Cursor::decode(token)
                .ok_or_else(|| ApiError::Validation("malformed cursor".into()))?,
        ),
        None => None,
    };
    Ok((limit, cursor))
}

pub async fn create_app(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateAppRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::validate_slug(&req.slug).map_err(ApiError::Validation)?;
    validate::validate_name(&req.name).map_err(ApiError::Validation)?;
    validate::validate_description(&req.description).map_err(ApiError::Validation)?;
    validate::validate_category(&req.category).map_err(ApiError::Validation)?;
    validate::validate_built_with(&req.built_with).map_err(ApiError::Validation)?;
    for url in [&req.cover_image, &req.website_url, &req.repo_url, &req.demo_url]
        .into_iter()
        .flatten()
    {
        validate::validate_url(url).map_err(ApiError::Validation)?;
    }

    if state.db.get_app_by_slug(&req.slug)?.is_some() {
        return Err(ApiError::Conflict(format!(
            "slug '{}' is already taken",
            req.slug
        )));
    }

    let id = Uuid::new_v4();
    let status = req.status.unwrap_or(PublishStatus::Draft);
    let now = time::now();
    let built_with_json = serde_json::to_string(&req.built_with)
        .map_err(|e| ApiError::Internal(e.into()))?;

    state.db.insert_app(&NewApp {
        id: id.to_string(),
        slug: req.slug.clone(),
        name: req.name.clone(),
        description: req.description.clone(),
        cover_image: req.cover_image.clone(),
        website_url: req.website_url.clone(),
        repo_url: req.repo_url.clone(),
        demo_url: req.demo_url.clone(),
        category: req.category.clone(),
        built_with: built_with_json,
        status: status.as_str().to_string(),
        owner_id: claims.sub.to_string(),
        created_at: now.clone(),
        updated_at: now.clone(),
    })?;

    let created_at = time::parse(&now).unwrap_or_default();
    Ok((
        StatusCode::CREATED,
        Json(AppResponse {
            id,
            slug: req.slug,
            name: req.name,
            description: req.description,
            cover_image: req.cover_image,
            website_url: req.website_url,
            repo_url: req.repo_url,
            demo_url: req.demo_url,
            category: req.category,
            built_with: req.built_with,
            status,
            owner_id: claims.sub,
            owner_username: claims.username,
            upvotes: 0,
            comments: 0,
            created_at,
            updated_at: created_at,
        }),
    ))
}

/// Published apps, newest first, cursor-paginated.
pub async fn list_apps(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, cursor) = page_params(&query, DEFAULT_APP_PAGE_SIZE)?;

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || {
        db.db.list_published_apps(limit + 1, cursor.as_ref())
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
        items: page.items.into_iter().map(app_response).collect::<Vec<_>>(),
        next_cursor: page.next_cursor,
    }))
}

pub async fn get_app(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_app_by_slug(&slug)?
        .ok_or_else(|| ApiError::NotFound("app not found".into()))?;

    // Drafts and archived apps exist only for their owner
    if row.status != PublishStatus::Published.as_str() {
        let viewer = maybe_claims(&headers, &state.jwt_secret);
        if viewer.map(|c| c.sub.to_string()) != Some(row.owner_id.clone()) {
            return Err(ApiError::NotFound("app not found".into()));
        }
    }

    Ok(Json(app_response(row)))
}

pub async fn my_apps(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_apps_by_owner(&claims.sub.to_string())?;
    Ok(Json(
        rows.into_iter().map(app_response).collect::<Vec<_>>(),
    ))
}

pub async fn update_app(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateAppRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_app_by_slug(&slug)?
        .ok_or_else(|| ApiError::NotFound("app not found".into()))?;

    if row.owner_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden("only the owner may edit this app".into()));
    }

    let changes = merge_changes(&row, &req, time::now())?;
    state.db.update_app(&row.id, &changes)?;

    let updated = state
        .db
        .get_app_by_slug(&slug)?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("app vanished mid-update")))?;
    Ok(Json(app_response(updated)))
}

pub async fn delete_app(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_app_by_slug(&slug)?
        .ok_or_else(|| ApiError::NotFound("app not found".into()))?;

    if row.owner_id != claims.sub.to_string() {
        return Err(ApiError::Forbidden(
            "only the owner may delete this app".into(),
        ));
    }

    // Comments and upvotes go with it via FK cascade
    state.db.delete_app(&row.id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Applies a partial update on top of the stored row, validating only the
/// fields the request actually carries.
fn merge_changes(
    row: &AppRow,
    req: &UpdateAppRequest,
    updated_at: String,
) -> Result<AppChanges, ApiError> {
    if let Some(name) = &req.name {
        validate::validate_name(name).map_err(ApiError::Validation)?;
    }
    if let Some(description) = &req.description {
        validate::validate_description(description).map_err(ApiError::Validation)?;
    }
    if let Some(category) = &req.category {
        validate::validate_category(category).map_err(ApiError::Validation)?;
    }
    if let Some(built_with) = &req.built_with {
        validate::validate_built_with(built_with).map_err(ApiError::Validation)?;
    }
    for url in [&req.cover_image, &req.website_url, &req.repo_url, &req.demo_url]
        .into_iter()
        .flatten()
    {
        validate::validate_url(url).map_err(ApiError::Validation)?;
    }

    let built_with = match &req.built_with {
        Some(list) => serde_json::to_string(list).map_err(|e| ApiError::Internal(e.into()))?,
        None => row.built_with.clone(),
    };

    Ok(AppChanges {
        name: req.name.clone().unwrap_or_else(|| row.name.clone()),
        description: req
            .description
            .clone()
            .unwrap_or_else(|| row.description.clone()),
        cover_image: req.cover_image.clone().or_else(|| row.cover_image.clone()),
        website_url: req.website_url.clone().or_else(|| row.website_url.clone()),
        repo_url: req.repo_url.clone().or_else(|| row.repo_url.clone()),
        demo_url: req.demo_url.clone().or_else(|| row.demo_url.clone()),
        category: req.category.clone().unwrap_or_else(|| row.category.clone()),
        built_with,
        status: req
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| row.status.clone()),
        updated_at,
    })
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_ts(value: &str, what: &str) -> DateTime<Utc> {
    time::parse(value).unwrap_or_else(|| {
        warn!("Corrupt {} '{}'", what, value);
        DateTime::<Utc>::default()
    })
}

fn app_response(row: AppRow) -> AppResponse {
    let built_with: Vec<String> = serde_json::from_str(&row.built_with).unwrap_or_else(|e| {
        warn!("Corrupt built_with on app '{}': {}", row.id, e);
        vec![]
    });
    let status = PublishStatus::parse(&row.status).unwrap_or_else(|| {
        warn!("Corrupt status '{}' on app '{}'", row.status, row.id);
        PublishStatus::Draft
    });

    AppResponse {
        id: parse_uuid(&row.id, "app id"),
        slug: row.slug,
        name: row.name,
        description: row.description,
        cover_image: row.cover_image,
        website_url: row.website_url,
        repo_url: row.repo_url,
        demo_url: row.demo_url,
        category: row.category,
        built_with,
        status,
        owner_id: parse_uuid(&row.owner_id, "owner id"),
        owner_username: row.owner_username,
        upvotes: row.upvotes,
        comments: row.comments,
        created_at: parse_ts(&row.created_at, "created_at"),
        updated_at: parse_ts(&row.updated_at, "updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_row() -> AppRow {
        AppRow {
            id: Uuid::new_v4().to_string(),
            slug: "my_app".into(),
            name: "My App".into(),
            description: "Does things".into(),
            cover_image: None,
            website_url: Some("https://example.com".into()),
            repo_url: None,
            demo_url: None,
            category: "developer_tools".into(),
            built_with: "[\"rust\"]".into(),
            status: "draft".into(),
            owner_id: Uuid::new_v4().to_string(),
            owner_username: "alice".into(),
            upvotes: 0,
            comments: 0,
            created_at: time::now(),
            updated_at: time::now(),
        }
    }

    #[test]
    fn test_merge_keeps_unpatched_fields() {
        let row = stored_row();
        let req = UpdateAppRequest {
            name: Some("Renamed".into()),
            ..Default::default()
        };
        let changes = merge_changes(&row, &req, time::now()).unwrap();
        assert_eq!(changes.name, "Renamed");
        assert_eq!(changes.description, "Does things");
        assert_eq!(changes.website_url.as_deref(), Some("https://example.com"));
        assert_eq!(changes.status, "draft");
    }

    #[test]
    fn test_merge_rejects_invalid_patch_fields() {
        let row = stored_row();
        let req = UpdateAppRequest {
            category: Some("miscellany".into()),
            ..Default::default()
        };
        assert!(matches!(
            merge_changes(&row, &req, time::now()),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_merge_applies_status_change() {
        let row = stored_row();
        let req = UpdateAppRequest {
            status: Some(PublishStatus::Published),
            ..Default::default()
        };
        let changes = merge_changes(&row, &req, time::now()).unwrap();
        assert_eq!(changes.status, "published");
    }

    #[test]
    fn test_page_params_rejects_malformed_cursor() {
        let query = PageQuery {
            limit: None,
            cursor: Some("garbage".into()),
        };
        assert!(matches!(
            page_params(&query, 20),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_page_params_clamps_limit() {
        let query = PageQuery {
            limit: Some(10_000),
            cursor: None,
        };
        let (limit, _) = page_params(&query, 20).unwrap();
        assert_eq!(limit, MAX_PAGE_SIZE);
    }
}
