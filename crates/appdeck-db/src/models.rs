/// Database row types — these map directly to SQLite rows.
/// Distinct from appdeck-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct NewApp {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub website_url: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub category: String,
    pub built_with: String,
    pub status: String,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Full values for an app update; the handler merges the patch into the
/// current row before calling the DB.
pub struct AppChanges {
    pub name: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub website_url: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub category: String,
    pub built_with: String,
    pub status: String,
    pub updated_at: String,
}

pub struct AppRow {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub website_url: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub category: String,
    pub built_with: String,
    pub status: String,
    pub owner_id: String,
    pub owner_username: String,
    pub upvotes: i64,
    pub comments: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub app_id: String,
    pub author_id: String,
    pub author_username: String,
    pub body: String,
    pub created_at: String,
}

/// The slice of a comment the deletion policy needs: authorship, the owning
/// app's owner, and whether the comment is already soft-deleted.
pub struct CommentMetaRow {
    pub id: String,
    pub app_id: String,
    pub author_id: String,
    pub app_owner_id: String,
    pub deleter: Option<String>,
}

pub struct DeletedCommentRow {
    pub id: String,
    pub app_id: String,
    pub author_id: String,
    pub body: String,
    pub deleter: String,
    pub delete_reason: Option<String>,
    pub deleted_by_user_id: Option<String>,
    pub deleted_at: String,
    pub created_at: String,
}
