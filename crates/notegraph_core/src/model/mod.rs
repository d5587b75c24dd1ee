//! Domain model for organization-scoped entries and change events.
//!
//! # Responsibility
//! - Define canonical data structures shared by store, graph and hub layers.
//! - Keep identifier semantics explicit in signatures.
//!
//! # Invariants
//! - Every entry is identified by a stable `EntryId`.
//! - An entry belongs to exactly one organization and one group for its
//!   whole lifetime.

pub mod entry;
pub mod event;
