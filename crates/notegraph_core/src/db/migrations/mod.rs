//! Embedded schema migrations for the entry store.
//!
//! # Responsibility
//! - Carry the ordered list of schema steps compiled into the binary.
//! - Bring any database file up to the current schema inside one
//!   transaction.
//!
//! # Invariants
//! - Step versions are strictly increasing.
//! - `PRAGMA user_version` always equals the last applied step after a
//!   successful run.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

const MIGRATIONS: &[(u32, &str)] = &[(1, include_str!("0001_entries.sql"))];

/// Latest schema version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(version, _)| *version)
}

/// Applies every schema step the database has not seen yet.
///
/// A database written by a newer build is rejected rather than touched.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let supported = latest_version();

    if found > supported {
        return Err(DbError::SchemaAhead { found, supported });
    }
    if found == supported {
        return Ok(());
    }

    let pending = MIGRATIONS
        .iter()
        .filter(|(version, _)| *version > found);

    let tx = conn.transaction()?;
    let mut applied = found;
    for (version, sql) in pending {
        tx.execute_batch(sql)?;
        applied = *version;
    }
    tx.execute_batch(&format!("PRAGMA user_version = {applied};"))?;
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={found} to_version={applied}"
    );
    Ok(())
}
