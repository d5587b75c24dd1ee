//! Diagnostic binary for the engine core.
//!
//! # Responsibility
//! - Verify `notegraph_core` wiring without any server or UI attached.
//! - Given a database path, open it, run migrations and report row counts.

use notegraph_core::db::open_db;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("notegraph_core version={}", notegraph_core::core_version());
    println!(
        "notegraph_core schema_version={}",
        notegraph_core::db::migrations::latest_version()
    );

    let Some(path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };

    let conn = match open_db(&path) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("failed to open database `{path}`: {err}");
            return ExitCode::FAILURE;
        }
    };

    let counts: Result<(i64, i64), rusqlite::Error> = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT org_id) FROM entries;",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    );
    match counts {
        Ok((entries, orgs)) => {
            println!("entries={entries} organizations={orgs}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to query `{path}`: {err}");
            ExitCode::FAILURE
        }
    }
}
