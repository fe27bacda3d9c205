use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS apps (
            id          TEXT PRIMARY KEY,
            slug        TEXT NOT NULL UNIQUE,
            name        TEXT NOT NULL,
            description TEXT NOT NULL,
            cover_image TEXT,
            website_url TEXT,
            repo_url    TEXT,
            demo_url    TEXT,
            category    TEXT NOT NULL,
            built_with  TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'draft',
            owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_apps_status
            ON apps(status, created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id                  TEXT PRIMARY KEY,
            app_id              TEXT NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
            author_id           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            body                TEXT NOT NULL,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL,
            -- soft-deletion metadata; a comment is active iff deleter IS NULL
            deleter             TEXT,
            delete_reason       TEXT,
            deleted_by_user_id  TEXT REFERENCES users(id) ON DELETE SET NULL,
            deleted_at          TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_comments_app
            ON comments(app_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_comments_deleted
            ON comments(deleted_at) WHERE deleter IS NOT NULL;

        CREATE TABLE IF NOT EXISTS upvotes (
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            app_id      TEXT NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (user_id, app_id)
        );

        CREATE INDEX IF NOT EXISTS idx_upvotes_app
            ON upvotes(app_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
