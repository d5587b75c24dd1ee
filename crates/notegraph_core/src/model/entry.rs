//! Entry domain model.
//!
//! # Responsibility
//! - Define the canonical entry record owned by the store.
//! - Provide the write-side request shapes used by the service layer.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another entry.
//! - `org_id` and `group_id` are set at creation and never change.
//! - `name` is unique within its `(org_id, group_id)` scope, compared
//!   case-insensitively.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for every entry.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type EntryId = Uuid;

/// Canonical domain record for one authored entry.
///
/// Organization/group/user identifiers are opaque strings issued by the
/// surrounding system; the core never interprets them beyond equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Stable global ID used for linking and change events.
    pub uuid: EntryId,
    /// Owning organization.
    pub org_id: String,
    /// Owning group within the organization.
    pub group_id: String,
    /// Human-readable name, unique within `(org_id, group_id)`.
    pub name: String,
    /// Text body; reference markers are scanned out of this field.
    pub content: String,
    /// Identifier returned by the external attachment store, if any.
    pub attachment_id: Option<String>,
    /// User that created the entry.
    pub created_by: String,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Last-modification timestamp in epoch milliseconds.
    pub updated_at: i64,
}

impl Entry {
    /// Creates a new entry with a generated stable ID.
    ///
    /// Timestamps are filled in by the store on insert; they start at zero
    /// here so an un-persisted entry is recognizable.
    pub fn new(
        org_id: impl Into<String>,
        group_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4(),
            org_id,
            group_id,
            name,
            content,
            created_by,
        )
    }

    /// Creates a new entry with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        uuid: EntryId,
        org_id: impl Into<String>,
        group_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            uuid,
            org_id: org_id.into(),
            group_id: group_id.into(),
            name: name.into(),
            content: content.into(),
            attachment_id: None,
            created_by: created_by.into(),
            created_at: 0,
            updated_at: 0,
        }
    }
}

/// Partial update applied by `update_entry`.
///
/// `None` fields are left untouched. Organization and group membership are
/// intentionally absent; they are immutable after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    /// New display name, if renaming.
    pub name: Option<String>,
    /// New text body, if editing.
    pub content: Option<String>,
    /// New attachment identifier, if replacing the attachment reference.
    pub attachment_id: Option<String>,
}

impl EntryUpdate {
    /// Returns whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.content.is_none() && self.attachment_id.is_none()
    }
}

/// Normalizes one entry name for matching and uniqueness checks.
///
/// The same rule is applied by the resolver, the graph cache and the
/// store's persisted `name_normalized` column: trim, then Unicode
/// lowercase.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
