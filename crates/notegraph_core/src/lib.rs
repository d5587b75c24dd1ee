//! Entry reference graph and real-time synchronization engine.
//! This crate is the single source of truth for business invariants:
//! entry storage, reference resolution, graph assembly and change fan-out.

pub mod access;
pub mod db;
pub mod files;
pub mod graph;
pub mod hub;
pub mod logging;
pub mod model;
pub mod repo;
pub mod resolver;
pub mod service;

pub use access::{AccessGate, EntryAction, Unauthorized};
pub use files::{AttachmentError, AttachmentResult, AttachmentStore};
pub use graph::cache::GraphCache;
pub use graph::{GraphEdge, GraphEntities, GraphNode};
pub use hub::dispatch::EntryHub;
pub use hub::registry::{SubscribeOutcome, SubscriptionRegistry, DEFAULT_QUEUE_CAPACITY};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entry::{normalize_name, Entry, EntryId, EntryUpdate};
pub use model::event::{ChangeEvent, ChangeKind};
pub use repo::entry_repo::{EntryRepository, SqliteEntryRepository, StoreError, StoreResult};
pub use resolver::links::{
    extract_markers, resolve_markers, EntryLinks, NameEntry, NameIndex, ResolvedReference,
};
pub use service::entry_service::{EntryService, EntryView, NewEntry, ServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
