//! Entry repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `entries` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Name uniqueness within `(org_id, group_id)` is enforced by the unique
//!   index and surfaced as `StoreError::DuplicateName`.
//! - All listings are ordered `updated_at DESC, uuid ASC`.
//! - Writes bump `updated_at`; reads never mutate.

use crate::db::DbError;
use crate::model::entry::{normalize_name, Entry, EntryId, EntryUpdate};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ENTRY_SELECT_SQL: &str = "SELECT
    uuid,
    org_id,
    group_id,
    name,
    content,
    attachment_id,
    created_by,
    created_at,
    updated_at
FROM entries";

pub type StoreResult<T> = Result<T, StoreError>;

/// Store error for entry persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    /// Another entry in the same group already uses this name.
    DuplicateName { name: String, group_id: String },
    /// Target entry does not exist.
    NotFound(EntryId),
    /// Backing persistence failed; callers should retry the whole operation.
    Db(DbError),
    /// Persisted state failed decoding; surfaced instead of masked.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName { name, group_id } => {
                write!(f, "entry name `{name}` already used in group `{group_id}`")
            }
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for entry CRUD operations.
pub trait EntryRepository {
    /// Inserts one entry and returns its stable id.
    fn create_entry(&self, entry: &Entry) -> StoreResult<EntryId>;
    /// Applies a partial update and returns the stored row after the write.
    fn update_entry(&self, id: EntryId, update: &EntryUpdate) -> StoreResult<Entry>;
    /// Gets one entry by id.
    fn get_entry(&self, id: EntryId) -> StoreResult<Option<Entry>>;
    /// Lists every entry in one group of one organization.
    fn list_by_group(&self, org_id: &str, group_id: &str) -> StoreResult<Vec<Entry>>;
    /// Lists every entry in one organization; used for graph rebuilds and
    /// name resolution.
    fn list_by_organization(&self, org_id: &str) -> StoreResult<Vec<Entry>>;
    /// Deletes one entry and returns the removed row.
    ///
    /// Absent ids yield `NotFound`; callers may treat that as an idempotent
    /// success.
    fn delete_entry(&self, id: EntryId) -> StoreResult<Entry>;
    /// Clears the attachment reference and returns the stored row after the
    /// write.
    fn clear_attachment(&self, id: EntryId) -> StoreResult<Entry>;
}

/// SQLite-backed entry repository.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn get_required(&self, id: EntryId) -> StoreResult<Entry> {
        self.get_entry(id)?.ok_or(StoreError::NotFound(id))
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn create_entry(&self, entry: &Entry) -> StoreResult<EntryId> {
        let inserted = self.conn.execute(
            "INSERT INTO entries (
                uuid,
                org_id,
                group_id,
                name,
                name_normalized,
                content,
                attachment_id,
                created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                entry.uuid.to_string(),
                entry.org_id.as_str(),
                entry.group_id.as_str(),
                entry.name.trim(),
                normalize_name(&entry.name),
                entry.content.as_str(),
                entry.attachment_id.as_deref(),
                entry.created_by.as_str(),
            ],
        );

        match inserted {
            Ok(_) => Ok(entry.uuid),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateName {
                name: entry.name.trim().to_string(),
                group_id: entry.group_id.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn update_entry(&self, id: EntryId, update: &EntryUpdate) -> StoreResult<Entry> {
        if update.is_empty() {
            return self.get_required(id);
        }

        // Fetched up front so rename collisions can report the owning group.
        let existing = self.get_required(id)?;

        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(name) = update.name.as_deref() {
            assignments.push("name = ?");
            bind_values.push(Value::Text(name.trim().to_string()));
            assignments.push("name_normalized = ?");
            bind_values.push(Value::Text(normalize_name(name)));
        }
        if let Some(content) = update.content.as_deref() {
            assignments.push("content = ?");
            bind_values.push(Value::Text(content.to_string()));
        }
        if let Some(attachment_id) = update.attachment_id.as_deref() {
            assignments.push("attachment_id = ?");
            bind_values.push(Value::Text(attachment_id.to_string()));
        }
        assignments.push("updated_at = (strftime('%s', 'now') * 1000)");

        let sql = format!(
            "UPDATE entries SET {} WHERE uuid = ?;",
            assignments.join(", ")
        );
        bind_values.push(Value::Text(id.to_string()));

        let changed = self
            .conn
            .execute(&sql, params_from_iter(bind_values))
            .map_err(|err| {
                if is_unique_violation(&err) {
                    StoreError::DuplicateName {
                        name: update.name.as_deref().unwrap_or_default().trim().to_string(),
                        group_id: existing.group_id.clone(),
                    }
                } else {
                    err.into()
                }
            })?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        self.get_required(id)
    }

    fn get_entry(&self, id: EntryId) -> StoreResult<Option<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE uuid = ?1;"))?;

        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }

        Ok(None)
    }

    fn list_by_group(&self, org_id: &str, group_id: &str) -> StoreResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL}
             WHERE org_id = ?1 AND group_id = ?2
             ORDER BY updated_at DESC, uuid ASC;"
        ))?;

        let mut rows = stmt.query(params![org_id, group_id])?;
        collect_entries(&mut rows)
    }

    fn list_by_organization(&self, org_id: &str) -> StoreResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL}
             WHERE org_id = ?1
             ORDER BY updated_at DESC, uuid ASC;"
        ))?;

        let mut rows = stmt.query([org_id])?;
        collect_entries(&mut rows)
    }

    fn delete_entry(&self, id: EntryId) -> StoreResult<Entry> {
        let entry = self.get_required(id)?;

        let changed = self
            .conn
            .execute("DELETE FROM entries WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(entry)
    }

    fn clear_attachment(&self, id: EntryId) -> StoreResult<Entry> {
        let changed = self.conn.execute(
            "UPDATE entries
             SET
                attachment_id = NULL,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        self.get_required(id)
    }
}

fn collect_entries(rows: &mut rusqlite::Rows<'_>) -> StoreResult<Vec<Entry>> {
    let mut entries = Vec::new();
    while let Some(row) = rows.next()? {
        entries.push(parse_entry_row(row)?);
    }
    Ok(entries)
}

fn parse_entry_row(row: &Row<'_>) -> StoreResult<Entry> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{uuid_text}` in entries.uuid"))
    })?;

    Ok(Entry {
        uuid,
        org_id: row.get("org_id")?,
        group_id: row.get("group_id")?,
        name: row.get("name")?,
        content: row.get("content")?,
        attachment_id: row.get("attachment_id")?,
        created_by: row.get("created_by")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            failure.code == rusqlite::ErrorCode::ConstraintViolation
                && message
                    .as_deref()
                    .map(|msg| msg.contains("idx_entries_group_name") || msg.contains("UNIQUE"))
                    .unwrap_or(true)
        }
        _ => false,
    }
}
