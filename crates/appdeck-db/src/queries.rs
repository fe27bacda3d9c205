use crate::Database;
use crate::models::{
    AppChanges, AppRow, CommentMetaRow, CommentRow, DeletedCommentRow, NewApp, UserRow,
};
use anyhow::Result;
use appdeck_types::page::Cursor;
use rusqlite::Connection;

const APP_SELECT: &str = "SELECT a.id, a.slug, a.name, a.description, a.cover_image,
        a.website_url, a.repo_url, a.demo_url, a.category, a.built_with,
        a.status, a.owner_id, u.username, a.created_at, a.updated_at,
        (SELECT COUNT(*) FROM upvotes v WHERE v.app_id = a.id),
        (SELECT COUNT(*) FROM comments c WHERE c.app_id = a.id AND c.deleter IS NULL)
     FROM apps a
     LEFT JOIN users u ON a.owner_id = u.id";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, appdeck_types::time::now()),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Apps --

    pub fn insert_app(&self, app: &NewApp) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO apps (id, slug, name, description, cover_image, website_url,
                                   repo_url, demo_url, category, built_with, status,
                                   owner_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                rusqlite::params![
                    app.id,
                    app.slug,
                    app.name,
                    app.description,
                    app.cover_image,
                    app.website_url,
                    app.repo_url,
                    app.demo_url,
                    app.category,
                    app.built_with,
                    app.status,
                    app.owner_id,
                    app.created_at,
                    app.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_app_by_slug(&self, slug: &str) -> Result<Option<AppRow>> {
        self.with_conn(|conn| {
            let sql = format!("{APP_SELECT} WHERE a.slug = ?1");
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_row([slug], map_app_row).optional()
        })
    }

    pub fn update_app(&self, id: &str, changes: &AppChanges) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE apps SET name = ?2, description = ?3, cover_image = ?4,
                        website_url = ?5, repo_url = ?6, demo_url = ?7, category = ?8,
                        built_with = ?9, status = ?10, updated_at = ?11
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    changes.name,
                    changes.description,
                    changes.cover_image,
                    changes.website_url,
                    changes.repo_url,
                    changes.demo_url,
                    changes.category,
                    changes.built_with,
                    changes.status,
                    changes.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_app(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM apps WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Newest-first page of published apps; fetches up to `limit` rows
    /// strictly before the cursor.
    pub fn list_published_apps(&self, limit: u32, before: Option<&Cursor>) -> Result<Vec<AppRow>> {
        self.with_conn(|conn| match before {
            Some(cursor) => {
                let sql = format!(
                    "{APP_SELECT} WHERE a.status = 'published'
                       AND (a.created_at < ?1 OR (a.created_at = ?1 AND a.id < ?2))
                     ORDER BY a.created_at DESC, a.id DESC LIMIT ?3"
                );
                let mut stmt = conn.prepare(&sql)?;
                collect_rows(stmt.query_map(
                    rusqlite::params![cursor.created_at, cursor.id, limit],
                    map_app_row,
                )?)
            }
            None => {
                let sql = format!(
                    "{APP_SELECT} WHERE a.status = 'published'
                     ORDER BY a.created_at DESC, a.id DESC LIMIT ?1"
                );
                let mut stmt = conn.prepare(&sql)?;
                collect_rows(stmt.query_map([limit], map_app_row)?)
            }
        })
    }

    /// Dashboard listing: everything the user owns, drafts included.
    pub fn list_apps_by_owner(&self, owner_id: &str) -> Result<Vec<AppRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{APP_SELECT} WHERE a.owner_id = ?1
                 ORDER BY a.created_at DESC, a.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            collect_rows(stmt.query_map([owner_id], map_app_row)?)
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        app_id: &str,
        author_id: &str,
        body: &str,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, app_id, author_id, body, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                rusqlite::params![id, app_id, author_id, body, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_comment_meta(&self, id: &str) -> Result<Option<CommentMetaRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.app_id, c.author_id, a.owner_id, c.deleter
                 FROM comments c
                 JOIN apps a ON c.app_id = a.id
                 WHERE c.id = ?1",
            )?;
            stmt.query_row([id], |row| {
                Ok(CommentMetaRow {
                    id: row.get(0)?,
                    app_id: row.get(1)?,
                    author_id: row.get(2)?,
                    app_owner_id: row.get(3)?,
                    deleter: row.get(4)?,
                })
            })
            .optional()
        })
    }

    /// Active comments for one app, newest first, joined with the author's
    /// username to avoid N+1 lookups.
    pub fn list_active_comments(
        &self,
        app_id: &str,
        limit: u32,
        before: Option<&Cursor>,
    ) -> Result<Vec<CommentRow>> {
        const SELECT: &str = "SELECT c.id, c.app_id, c.author_id, u.username, c.body, c.created_at
             FROM comments c
             LEFT JOIN users u ON c.author_id = u.id
             WHERE c.app_id = ?1 AND c.deleter IS NULL";

        self.with_conn(|conn| match before {
            Some(cursor) => {
                let sql = format!(
                    "{SELECT} AND (c.created_at < ?2 OR (c.created_at = ?2 AND c.id < ?3))
                     ORDER BY c.created_at DESC, c.id DESC LIMIT ?4"
                );
                let mut stmt = conn.prepare(&sql)?;
                collect_rows(stmt.query_map(
                    rusqlite::params![app_id, cursor.created_at, cursor.id, limit],
                    map_comment_row,
                )?)
            }
            None => {
                let sql =
                    format!("{SELECT} ORDER BY c.created_at DESC, c.id DESC LIMIT ?2");
                let mut stmt = conn.prepare(&sql)?;
                collect_rows(stmt.query_map(rusqlite::params![app_id, limit], map_comment_row)?)
            }
        })
    }

    /// Marks a comment soft-deleted. Returns false when the comment was
    /// already soft-deleted (the row is left untouched).
    pub fn soft_delete_comment(
        &self,
        id: &str,
        deleter: &str,
        reason: Option<&str>,
        deleted_by: &str,
        deleted_at: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE comments
                 SET deleter = ?2, delete_reason = ?3, deleted_by_user_id = ?4,
                     deleted_at = ?5, updated_at = ?5
                 WHERE id = ?1 AND deleter IS NULL",
                rusqlite::params![id, deleter, reason, deleted_by, deleted_at],
            )?;
            Ok(n == 1)
        })
    }

    pub fn list_deleted_comments_by_author(&self, author_id: &str) -> Result<Vec<DeletedCommentRow>> {
        self.list_deleted_comments("author_id", author_id)
    }

    pub fn list_deleted_comments_for_app(&self, app_id: &str) -> Result<Vec<DeletedCommentRow>> {
        self.list_deleted_comments("app_id", app_id)
    }

    fn list_deleted_comments(&self, column: &str, value: &str) -> Result<Vec<DeletedCommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, app_id, author_id, body, deleter, delete_reason,
                        deleted_by_user_id, deleted_at, created_at
                 FROM comments
                 WHERE {column} = ?1 AND deleter IS NOT NULL
                 ORDER BY deleted_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            collect_rows(stmt.query_map([value], |row| {
                Ok(DeletedCommentRow {
                    id: row.get(0)?,
                    app_id: row.get(1)?,
                    author_id: row.get(2)?,
                    body: row.get(3)?,
                    deleter: row.get(4)?,
                    delete_reason: row.get(5)?,
                    deleted_by_user_id: row.get(6)?,
                    deleted_at: row.get(7)?,
                    created_at: row.get(8)?,
                })
            })?)
        })
    }

    /// Permanently removes comments soft-deleted before `cutoff`, in
    /// independently committed batches so an interrupted sweep neither holds
    /// long locks nor loses completed work. Returns the number of rows
    /// removed by this run.
    pub fn purge_expired_comments(&self, cutoff: &str, batch_size: usize) -> Result<usize> {
        let mut total = 0;
        loop {
            let deleted = self.with_conn_mut(|conn| {
                let n = conn.execute(
                    "DELETE FROM comments WHERE id IN (
                         SELECT id FROM comments
                         WHERE deleter IS NOT NULL AND deleted_at < ?1
                         LIMIT ?2)",
                    rusqlite::params![cutoff, batch_size as i64],
                )?;
                Ok(n)
            })?;
            total += deleted;
            if deleted < batch_size {
                break;
            }
        }
        Ok(total)
    }

    // -- Upvotes --

    /// Flip the (user, app) upvote: removes it if present, inserts it if not.
    /// Check and flip run in one transaction; the composite primary key is
    /// the backstop against concurrent duplicates.
    /// Returns true when the upvote was added, false when removed.
    pub fn toggle_upvote(&self, user_id: &str, app_id: &str, created_at: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT user_id FROM upvotes WHERE user_id = ?1 AND app_id = ?2",
                    rusqlite::params![user_id, app_id],
                    |row| row.get(0),
                )
                .optional()?;

            let added = if existing.is_some() {
                tx.execute(
                    "DELETE FROM upvotes WHERE user_id = ?1 AND app_id = ?2",
                    rusqlite::params![user_id, app_id],
                )?;
                false
            } else {
                tx.execute(
                    "INSERT INTO upvotes (user_id, app_id, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![user_id, app_id, created_at],
                )?;
                true
            };

            tx.commit()?;
            Ok(added)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT id, username, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_app_row(row: &rusqlite::Row) -> rusqlite::Result<AppRow> {
    Ok(AppRow {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        cover_image: row.get(4)?,
        website_url: row.get(5)?,
        repo_url: row.get(6)?,
        demo_url: row.get(7)?,
        category: row.get(8)?,
        built_with: row.get(9)?,
        status: row.get(10)?,
        owner_id: row.get(11)?,
        owner_username: row
            .get::<_, Option<String>>(12)?
            .unwrap_or_else(|| "unknown".to_string()),
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
        upvotes: row.get(15)?,
        comments: row.get(16)?,
    })
}

fn map_comment_row(row: &rusqlite::Row) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        app_id: row.get(1)?,
        author_id: row.get(2)?,
        author_username: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        body: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn collect_rows<T>(
    rows: impl Iterator<Item = std::result::Result<T, rusqlite::Error>>,
) -> Result<Vec<T>> {
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Into::into)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appdeck_types::page::paginate;
    use appdeck_types::time;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, "argon2-hash").unwrap();
        id
    }

    fn seed_app(db: &Database, owner_id: &str, slug: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let now = time::now();
        db.insert_app(&NewApp {
            id: id.clone(),
            slug: slug.to_string(),
            name: "Test App".to_string(),
            description: "An app for tests".to_string(),
            cover_image: None,
            website_url: None,
            repo_url: None,
            demo_url: None,
            category: "developer_tools".to_string(),
            built_with: "[\"rust\"]".to_string(),
            status: "published".to_string(),
            owner_id: owner_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
        })
        .unwrap();
        id
    }

    fn seed_comment(db: &Database, app_id: &str, author_id: &str, created_at: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_comment(&id, app_id, author_id, "a perfectly fine comment", created_at)
            .unwrap();
        id
    }

    fn count(db: &Database, sql: &str) -> i64 {
        db.with_conn(|conn| conn.query_row(sql, [], |row| row.get(0)).map_err(Into::into))
            .unwrap()
    }

    #[test]
    fn test_toggle_upvote_oscillates() {
        let db = test_db();
        let user = seed_user(&db, "alice");
        let app = seed_app(&db, &user, "my_app");

        assert!(db.toggle_upvote(&user, &app, &time::now()).unwrap());
        assert!(!db.toggle_upvote(&user, &app, &time::now()).unwrap());
        assert!(db.toggle_upvote(&user, &app, &time::now()).unwrap());
        assert_eq!(count(&db, "SELECT COUNT(*) FROM upvotes"), 1);
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let db = test_db();
        let user = seed_user(&db, "alice");
        seed_app(&db, &user, "my_app");

        let other = Uuid::new_v4().to_string();
        let now = time::now();
        let err = db.insert_app(&NewApp {
            id: other,
            slug: "my_app".to_string(),
            name: "Clone".to_string(),
            description: "same slug".to_string(),
            cover_image: None,
            website_url: None,
            repo_url: None,
            demo_url: None,
            category: "other".to_string(),
            built_with: "[\"go\"]".to_string(),
            status: "draft".to_string(),
            owner_id: user,
            created_at: now.clone(),
            updated_at: now,
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_comment_pagination_two_pages() {
        let db = test_db();
        let user = seed_user(&db, "alice");
        let app = seed_app(&db, &user, "my_app");

        let base = Utc::now();
        for i in 0..16 {
            let ts = time::format(base - Duration::seconds(i));
            seed_comment(&db, &app, &user, &ts);
        }

        let limit = 15usize;
        let rows = db.list_active_comments(&app, limit as u32 + 1, None).unwrap();
        let first = paginate(rows, limit, |r| Cursor {
            created_at: r.created_at.clone(),
            id: r.id.clone(),
        });
        assert_eq!(first.items.len(), 15);
        let token = first.next_cursor.expect("more pages expected");

        let cursor = Cursor::decode(&token).unwrap();
        let rows = db
            .list_active_comments(&app, limit as u32 + 1, Some(&cursor))
            .unwrap();
        let second = paginate(rows, limit, |r| Cursor {
            created_at: r.created_at.clone(),
            id: r.id.clone(),
        });
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.next_cursor, None);

        // No row appears on both pages
        assert!(
            first
                .items
                .iter()
                .all(|a| second.items.iter().all(|b| a.id != b.id))
        );
    }

    #[test]
    fn test_pagination_breaks_timestamp_ties_by_id() {
        let db = test_db();
        let user = seed_user(&db, "alice");
        let app = seed_app(&db, &user, "my_app");

        // All four comments share one timestamp
        let ts = time::now();
        for _ in 0..4 {
            seed_comment(&db, &app, &user, &ts);
        }

        let rows = db.list_active_comments(&app, 3, None).unwrap();
        let first = paginate(rows, 2, |r| Cursor {
            created_at: r.created_at.clone(),
            id: r.id.clone(),
        });
        let cursor = Cursor::decode(&first.next_cursor.unwrap()).unwrap();
        let rest = db.list_active_comments(&app, 3, Some(&cursor)).unwrap();

        let mut seen: Vec<String> = first.items.iter().map(|r| r.id.clone()).collect();
        seen.extend(rest.iter().map(|r| r.id.clone()));
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 4, "ties must neither skip nor duplicate rows");
    }

    #[test]
    fn test_soft_delete_hides_from_active_listing() {
        let db = test_db();
        let author = seed_user(&db, "alice");
        let owner = seed_user(&db, "bob");
        let app = seed_app(&db, &owner, "my_app");
        let comment = seed_comment(&db, &app, &author, &time::now());

        let changed = db
            .soft_delete_comment(&comment, "appOwner", Some("spam"), &owner, &time::now())
            .unwrap();
        assert!(changed);

        let active = db.list_active_comments(&app, 10, None).unwrap();
        assert!(active.is_empty());

        let by_author = db.list_deleted_comments_by_author(&author).unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].deleter, "appOwner");
        assert_eq!(by_author[0].delete_reason.as_deref(), Some("spam"));

        let for_app = db.list_deleted_comments_for_app(&app).unwrap();
        assert_eq!(for_app.len(), 1);
        assert_eq!(for_app[0].id, comment);
    }

    #[test]
    fn test_soft_delete_is_single_shot() {
        let db = test_db();
        let author = seed_user(&db, "alice");
        let app = seed_app(&db, &author, "my_app");
        let comment = seed_comment(&db, &app, &author, &time::now());

        assert!(
            db.soft_delete_comment(&comment, "author", None, &author, &time::now())
                .unwrap()
        );
        assert!(
            !db.soft_delete_comment(&comment, "author", None, &author, &time::now())
                .unwrap()
        );
    }

    #[test]
    fn test_purge_respects_retention_window() {
        let db = test_db();
        let author = seed_user(&db, "alice");
        let app = seed_app(&db, &author, "my_app");

        let stale = seed_comment(&db, &app, &author, &time::now());
        let fresh = seed_comment(&db, &app, &author, &time::now());

        let now = Utc::now();
        db.soft_delete_comment(
            &stale,
            "author",
            None,
            &author,
            &time::format(now - Duration::days(31)),
        )
        .unwrap();
        db.soft_delete_comment(
            &fresh,
            "author",
            None,
            &author,
            &time::format(now - Duration::days(29)),
        )
        .unwrap();

        let cutoff = time::format(now - Duration::days(30));
        assert_eq!(db.purge_expired_comments(&cutoff, 500).unwrap(), 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM comments"), 1);

        // Re-running with nothing eligible is a no-op
        assert_eq!(db.purge_expired_comments(&cutoff, 500).unwrap(), 0);
        assert!(db.get_comment_meta(&fresh).unwrap().is_some());
    }

    #[test]
    fn test_purge_runs_in_batches() {
        let db = test_db();
        let author = seed_user(&db, "alice");
        let app = seed_app(&db, &author, "my_app");

        let deleted_at = time::format(Utc::now() - Duration::days(40));
        for _ in 0..7 {
            let id = seed_comment(&db, &app, &author, &time::now());
            db.soft_delete_comment(&id, "author", None, &author, &deleted_at)
                .unwrap();
        }

        let cutoff = time::format(Utc::now() - Duration::days(30));
        assert_eq!(db.purge_expired_comments(&cutoff, 3).unwrap(), 7);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM comments"), 0);
    }

    #[test]
    fn test_app_delete_cascades() {
        let db = test_db();
        let owner = seed_user(&db, "alice");
        let fan = seed_user(&db, "bob");
        let app = seed_app(&db, &owner, "my_app");

        seed_comment(&db, &app, &fan, &time::now());
        db.toggle_upvote(&fan, &app, &time::now()).unwrap();

        db.delete_app(&app).unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM comments"), 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM upvotes"), 0);
    }

    #[test]
    fn test_app_counts_exclude_soft_deleted_comments() {
        let db = test_db();
        let owner = seed_user(&db, "alice");
        let app = seed_app(&db, &owner, "my_app");

        seed_comment(&db, &app, &owner, &time::now());
        let removed = seed_comment(&db, &app, &owner, &time::now());
        db.soft_delete_comment(&removed, "author", None, &owner, &time::now())
            .unwrap();

        let row = db.get_app_by_slug("my_app").unwrap().unwrap();
        assert_eq!(row.comments, 1);
        assert_eq!(row.owner_username, "alice");
    }
}
