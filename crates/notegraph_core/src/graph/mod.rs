//! Per-organization reference graph views.
//!
//! # Responsibility
//! - Assemble node/edge views over an organization's entries.
//! - Maintain an incremental cache so one mutation never forces a rescan of
//!   every entry's text.
//!
//! # Invariants
//! - The graph is derived state; the entry store stays the source of truth.
//! - A returned view never contains a node for a deleted entry or an edge to
//!   a renamed/deleted target.

pub mod cache;

use crate::model::entry::EntryId;
use serde::{Deserialize, Serialize};

/// One graph node: an entry with its display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub entry_id: EntryId,
    pub name: String,
    pub group_id: String,
}

/// One directed edge: the source entry's text references the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: EntryId,
    pub target: EntryId,
}

/// Full node/edge view for one organization, served to visualization
/// clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEntities {
    /// All current entries, ascending by entry id.
    pub nodes: Vec<GraphNode>,
    /// All currently resolved references, grouped by source node.
    pub edges: Vec<GraphEdge>,
}
