//! Snapshot database schema definitions and migration logic.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the issue snapshot database.
pub const SCHEMA_SQL: &str = r"
    -- One row per cache key (view id); issues is the JSON array of documents
    CREATE TABLE IF NOT EXISTS issue_snapshots (
        cache_key TEXT PRIMARY KEY,
        issues TEXT NOT NULL,
        issue_count INTEGER NOT NULL DEFAULT 0,
        fetched_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Apply the schema to the database.
///
/// Idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    run_migrations(conn)?;

    conn.pragma_update(None, "journal_mode", "WAL")?;

    Ok(())
}

/// Run schema migrations for existing databases.
fn run_migrations(conn: &Connection) -> Result<()> {
    // Snapshots written before issue_count existed lack the column
    let has_issue_count: bool = conn
        .prepare("SELECT 1 FROM pragma_table_info('issue_snapshots') WHERE name='issue_count'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !has_issue_count {
        conn.execute(
            "ALTER TABLE issue_snapshots ADD COLUMN issue_count INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
    }

    conn.execute(
        "INSERT INTO metadata (key, value) VALUES ('schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}
