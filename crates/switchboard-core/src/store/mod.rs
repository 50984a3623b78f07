//! SQLite-backed graph store.
//!
//! This module implements the store port the state machine writes through:
//! module rows, typed dependency edges, and the versioned schema. All
//! helpers take a shared `&Connection` so they compose with multi-row
//! transactions (cascade deactivation commits as one unit of work).

pub mod query;
pub mod schema;
pub mod write;

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// Current schema version, stored in `PRAGMA user_version`.
const SCHEMA_VERSION: i64 = 2;

/// Open (or create) a registry database at `path` and apply migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("open registry database at {}", path.display()))?;
    configure(&conn)?;
    apply_migrations(&conn)?;
    Ok(conn)
}

/// Open a fresh in-memory registry. Used by tests and ephemeral tooling.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory registry database")?;
    configure(&conn)?;
    apply_migrations(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enable foreign keys")?;
    Ok(())
}

/// Apply any outstanding schema migrations, tracked via `user_version`.
fn apply_migrations(conn: &Connection) -> Result<()> {
    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("read schema version")?;

    if version < 1 {
        conn.execute_batch(schema::MIGRATION_V1_SQL)
            .context("apply schema migration v1")?;
    }
    if version < 2 {
        conn.execute_batch(schema::MIGRATION_V2_SQL)
            .context("apply schema migration v2")?;
    }

    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .context("record schema version")?;
        tracing::debug!(previous = version, current = SCHEMA_VERSION, "migrated registry schema");
    }

    Ok(())
}

/// Microsecond wall-clock timestamp for row bookkeeping columns.
pub(crate) fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}
