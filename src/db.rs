use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::Connection;

use crate::error::{Result, StorageContext};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    title        TEXT NOT NULL CHECK(length(title) > 0),
    description  TEXT NOT NULL DEFAULT '',
    status       TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active', 'completed')),
    priority     TEXT NOT NULL DEFAULT 'medium' CHECK(priority IN ('low', 'medium', 'high')),
    due_date     TEXT,
    archived     INTEGER NOT NULL DEFAULT 0 CHECK(archived IN (0, 1)),
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_tasks_archived_status ON tasks(archived, status);
CREATE INDEX IF NOT EXISTS idx_tasks_priority ON tasks(priority);
CREATE INDEX IF NOT EXISTS idx_tasks_due_date ON tasks(due_date);
";

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

fn set_pragmas(conn: &Connection, busy_timeout_ms: u64) -> Result<()> {
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = {busy_timeout_ms};"
    ))
    .storage("set pragmas")?;
    Ok(())
}

/// `taskdesk_lower(x)`: Unicode lowercase, used for case-insensitive search.
/// SQLite's own `lower()` and `LIKE` only fold ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "taskdesk_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
    .storage("register functions")?;
    Ok(())
}

pub fn open(path: &str, busy_timeout_ms: u64) -> Result<Connection> {
    let conn = Connection::open(path).storage("open database")?;
    set_pragmas(&conn, busy_timeout_ms)?;
    register_functions(&conn)?;
    log::debug!("opened database at {path}");
    Ok(conn)
}

/// Create the tasks table and its indexes (idempotent).
pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA).storage("create schema")?;
    Ok(())
}

pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().storage("open database")?;
    set_pragmas(&conn, DEFAULT_BUSY_TIMEOUT_MS)?;
    register_functions(&conn)?;
    init(&conn)?;
    Ok(conn)
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that string
/// comparison in SQL is chronological comparison.
pub fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
