use notegraph_core::db::migrations::{apply_migrations, latest_version};
use notegraph_core::db::{open_db, open_db_in_memory};
use rusqlite::params;

#[test]
fn migrations_apply_and_track_user_version() {
    let conn = open_db_in_memory().unwrap();
    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
    assert!(latest_version() >= 1);
}

#[test]
fn file_backed_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entries.db");

    {
        let conn = open_db(&path).unwrap();
        conn.execute(
            "INSERT INTO entries (uuid, org_id, group_id, name, name_normalized, content, created_by)
             VALUES (?1, 'org-1', 'grp-1', 'Budget', 'budget', '', 'user-1');",
            params![uuid::Uuid::new_v4().to_string()],
        )
        .unwrap();
    }

    let conn = open_db(&path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM entries;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn migrations_are_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    apply_migrations(&mut conn).unwrap();
    apply_migrations(&mut conn).unwrap();

    let version: u32 = conn
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, latest_version());
}

#[test]
fn entries_table_exists_with_expected_columns() {
    let conn = open_db_in_memory().unwrap();
    let mut stmt = conn.prepare("PRAGMA table_info(entries);").unwrap();
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    for expected in [
        "uuid",
        "org_id",
        "group_id",
        "name",
        "name_normalized",
        "content",
        "attachment_id",
        "created_by",
        "created_at",
        "updated_at",
    ] {
        assert!(columns.iter().any(|c| c == expected), "missing {expected}");
    }
}

#[test]
fn normalized_name_uniqueness_is_enforced_at_schema_level() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO entries (uuid, org_id, group_id, name, name_normalized, content, created_by)
         VALUES (?1, 'org-1', 'grp-1', 'Budget', 'budget', '', 'user-1');",
        params![uuid::Uuid::new_v4().to_string()],
    )
    .unwrap();

    let duplicate = conn.execute(
        "INSERT INTO entries (uuid, org_id, group_id, name, name_normalized, content, created_by)
         VALUES (?1, 'org-1', 'grp-1', 'budget', 'budget', '', 'user-1');",
        params![uuid::Uuid::new_v4().to_string()],
    );
    assert!(duplicate.is_err());

    // Same normalized name in another group is allowed.
    conn.execute(
        "INSERT INTO entries (uuid, org_id, group_id, name, name_normalized, content, created_by)
         VALUES (?1, 'org-1', 'grp-2', 'budget', 'budget', '', 'user-1');",
        params![uuid::Uuid::new_v4().to_string()],
    )
    .unwrap();
}
