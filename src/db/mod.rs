//! SQLite persistence: connection pool, schema, and query layer.

mod from_row;
pub mod queries;

use std::sync::Arc;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::config::Config;
use crate::error::Result;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<Config>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS licenses (
    id            TEXT PRIMARY KEY,
    key           TEXT NOT NULL UNIQUE,
    type          TEXT NOT NULL,
    email         TEXT NOT NULL,
    -- stored normalized; the UNIQUE constraint is the uniqueness check,
    -- there is no read-then-insert pre-check
    domain        TEXT NOT NULL UNIQUE,
    status        TEXT NOT NULL,
    purchased_at  INTEGER NOT NULL,
    expires_at    INTEGER,
    usage_count   INTEGER NOT NULL DEFAULT 0,
    last_used     INTEGER,
    source        TEXT NOT NULL,
    metadata      TEXT NOT NULL DEFAULT '{}',
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_licenses_email ON licenses(email);
CREATE INDEX IF NOT EXISTS idx_licenses_status ON licenses(status);

CREATE TABLE IF NOT EXISTS feedback_requests (
    id            TEXT PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT,
    tel           TEXT,
    tg            TEXT,
    message       TEXT NOT NULL,
    status        TEXT NOT NULL,
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_feedback_status ON feedback_requests(status);
";

/// Open a pooled connection manager for the given database file.
pub fn init_pool(database_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)
    });
    Ok(r2d2::Pool::new(manager)?)
}

/// Create tables and indexes. Safe to run repeatedly.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
