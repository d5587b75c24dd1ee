//! Authorization contract consulted before mutating operations.
//!
//! # Responsibility
//! - Define the capability check the surrounding system injects into the
//!   core.
//!
//! # Invariants
//! - The core never inspects credentials, roles or licences itself; a
//!   boolean answer from the gate is final.
//! - A denied action performs no store mutation and no broadcast.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Mutating action submitted to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryAction {
    Create,
    Update,
    Delete,
}

impl EntryAction {
    /// Stable string id used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// External role/licence check, injected at engine construction.
pub trait AccessGate: Send + Sync {
    /// Returns whether `user_id` may perform `action` within `org_id`.
    fn authorize(&self, user_id: &str, org_id: &str, action: EntryAction) -> bool;
}

/// Denial surfaced to mutation callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unauthorized {
    pub user_id: String,
    pub org_id: String,
    pub action: EntryAction,
}

impl Display for Unauthorized {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "user `{}` is not allowed to {} entries in organization `{}`",
            self.user_id,
            self.action.as_str(),
            self.org_id
        )
    }
}

impl Error for Unauthorized {}
