use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DeleteReason, Deleter, PublishStatus};

// -- JWT Claims --

/// JWT claims shared between the REST middleware and the auth handlers.
/// Canonical definition lives here in appdeck-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Apps --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAppRequest {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub website_url: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub category: String,
    pub built_with: Vec<String>,
    pub status: Option<PublishStatus>,
}

/// Partial update; `None` means "leave unchanged". The slug is immutable
/// because it is the public addressing key.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAppRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub website_url: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub category: Option<String>,
    pub built_with: Option<Vec<String>>,
    pub status: Option<PublishStatus>,
}

#[derive(Debug, Serialize)]
pub struct AppResponse {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub website_url: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub category: String,
    pub built_with: Vec<String>,
    pub status: PublishStatus,
    pub owner_id: Uuid,
    pub owner_username: String,
    pub upvotes: i64,
    pub comments: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub app_id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Owner-side moderation request. The reason is mandatory; it is carried as a
/// plain string so a missing or unknown value surfaces as a validation error
/// instead of a deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModerateCommentRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedCommentResponse {
    pub id: Uuid,
    pub app_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub deleter: Deleter,
    pub delete_reason: Option<DeleteReason>,
    pub deleted_by_user_id: Option<Uuid>,
    pub deleted_at: DateTime<Utc>,
    pub days_remaining: i64,
    pub created_at: DateTime<Utc>,
}

// -- Upvotes --

#[derive(Debug, Serialize)]
pub struct ToggleUpvoteResponse {
    pub success: bool,
    pub action: &'static str,
}

// -- Retention sweep --

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub success: bool,
    pub deleted: usize,
}
