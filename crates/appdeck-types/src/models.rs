use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Soft-deleted comments stay visible to their author and the app owner for
/// this many days before the retention sweep purges them.
pub const RETENTION_DAYS: i64 = 30;

/// Fixed category vocabulary for submitted apps.
pub const CATEGORIES: &[&str] = &[
    "productivity",
    "developer_tools",
    "design",
    "ai_ml",
    "games",
    "social",
    "education",
    "finance",
    "health",
    "other",
];

/// Fixed technology vocabulary for the `built_with` list.
pub const TECHNOLOGIES: &[&str] = &[
    "rust",
    "typescript",
    "javascript",
    "python",
    "go",
    "react",
    "svelte",
    "vue",
    "nextjs",
    "nodejs",
    "postgres",
    "sqlite",
    "redis",
    "docker",
    "tailwind",
    "graphql",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Draft,
    Published,
    Archived,
}

impl PublishStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Published => "published",
            PublishStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PublishStatus::Draft),
            "published" => Some(PublishStatus::Published),
            "archived" => Some(PublishStatus::Archived),
            _ => None,
        }
    }
}

/// Who soft-deleted a comment. A comment is active iff no deleter is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deleter {
    #[serde(rename = "author")]
    Author,
    #[serde(rename = "appOwner")]
    AppOwner,
}

impl Deleter {
    pub fn as_str(self) -> &'static str {
        match self {
            Deleter::Author => "author",
            Deleter::AppOwner => "appOwner",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "author" => Some(Deleter::Author),
            "appOwner" => Some(Deleter::AppOwner),
            _ => None,
        }
    }
}

/// App owners must pick one of these when removing someone else's comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteReason {
    Spam,
    Inappropriate,
    OffTopic,
    Other,
}

impl DeleteReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DeleteReason::Spam => "spam",
            DeleteReason::Inappropriate => "inappropriate",
            DeleteReason::OffTopic => "off_topic",
            DeleteReason::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "spam" => Some(DeleteReason::Spam),
            "inappropriate" => Some(DeleteReason::Inappropriate),
            "off_topic" => Some(DeleteReason::OffTopic),
            "other" => Some(DeleteReason::Other),
            _ => None,
        }
    }
}

/// Days until a soft-deleted comment is eligible for permanent purge:
/// `max(0, ceil((deleted_at + RETENTION_DAYS - now) / 1 day))`.
pub fn days_remaining(deleted_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let left = deleted_at + Duration::days(RETENTION_DAYS) - now;
    let secs = left.num_seconds();
    if secs <= 0 { 0 } else { (secs + 86_399) / 86_400 }
}
