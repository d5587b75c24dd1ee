//! External attachment store contract.
//!
//! # Responsibility
//! - Define the blob-storage collaborator interface the core calls for
//!   attachment lifecycle.
//!
//! # Invariants
//! - The core only persists the opaque identifier returned by `upload` and
//!   never interprets file contents.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AttachmentResult<T> = Result<T, AttachmentError>;

/// Failure reported by the external attachment store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentError {
    /// The identifier is unknown to the store.
    NotFound(String),
    /// Transport or backend failure; the operation may be retried.
    Unavailable(String),
}

impl Display for AttachmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "attachment not found: {id}"),
            Self::Unavailable(message) => write!(f, "attachment store unavailable: {message}"),
        }
    }
}

impl Error for AttachmentError {}

/// Blob storage collaborator for entry attachments.
pub trait AttachmentStore: Send + Sync {
    /// Stores one file and returns its opaque identifier.
    fn upload(&self, bytes: &[u8], file_name: &str) -> AttachmentResult<String>;
    /// Retrieves one file by identifier.
    fn download(&self, attachment_id: &str) -> AttachmentResult<Vec<u8>>;
    /// Deletes one file by identifier; deleting an unknown id is surfaced
    /// as `NotFound` and callers may treat it as success.
    fn delete(&self, attachment_id: &str) -> AttachmentResult<()>;
}
