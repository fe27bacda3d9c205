use serde::Serialize;
use uuid::Uuid;

use crate::time;

pub const DEFAULT_COMMENT_PAGE_SIZE: u32 = 15;
pub const DEFAULT_APP_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Compound pagination cursor over `(created_at, id)`.
///
/// A timestamp-only cursor can silently skip or duplicate rows when several
/// rows share a creation timestamp; the row id breaks the tie
/// deterministically. `created_at` is kept in its stored RFC 3339 text form
/// so the SQL comparison stays a string compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: String,
    pub id: String,
}

impl Cursor {
    pub fn encode(&self) -> String {
        format!("{}~{}", self.created_at, self.id)
    }

    /// Parses `<rfc3339>~<uuid>`, rejecting tokens that fail either half.
    pub fn decode(token: &str) -> Option<Self> {
        let (ts, id) = token.split_once('~')?;
        time::parse(ts)?;
        id.parse::<Uuid>().ok()?;
        Some(Cursor {
            created_at: ts.to_string(),
            id: id.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// Turns a `limit + 1` fetch into a page: if an extra row came back there are
/// more pages, so trim to `limit` and emit the last kept row's cursor.
pub fn paginate<T>(mut rows: Vec<T>, limit: usize, cursor_of: impl Fn(&T) -> Cursor) -> Page<T> {
    if rows.len() > limit {
        rows.truncate(limit);
        let next_cursor = rows.last().map(|row| cursor_of(row).encode());
        Page {
            items: rows,
            next_cursor,
        }
    } else {
        Page {
            items: rows,
            next_cursor: None,
        }
    }
}
