//! Change events pushed to organization subscribers.
//!
//! # Responsibility
//! - Describe one entry mutation in a transport-neutral shape.
//!
//! # Invariants
//! - Events are immutable once constructed and never persisted.
//! - `org_id` scopes delivery; subscribers of other organizations never
//!   receive the event.

use crate::model::entry::EntryId;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of entry mutation described by a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    /// Stable string id used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// One entry mutation, scoped to an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Organization whose subscribers should receive this event.
    pub org_id: String,
    /// Entry the mutation applied to.
    pub entry_id: EntryId,
    /// What happened.
    pub kind: ChangeKind,
    /// Event construction time in epoch milliseconds.
    pub timestamp_ms: i64,
}

impl ChangeEvent {
    /// Builds an event stamped with the current wall-clock time.
    pub fn now(org_id: impl Into<String>, entry_id: EntryId, kind: ChangeKind) -> Self {
        Self {
            org_id: org_id.into(),
            entry_id,
            kind,
            timestamp_ms: epoch_ms(),
        }
    }
}

fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
