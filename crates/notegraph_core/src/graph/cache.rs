//! Incremental reference graph cache.
//!
//! # Responsibility
//! - Keep per-entry marker lists so a mutation only re-scans the mutated
//!   entry's text.
//! - Assemble edges on read against the current name set, so renames and
//!   deletes demote stale references without touching other cached entries.
//!
//! # Invariants
//! - Writers mutate the cache inside the per-organization serialization
//!   section; the cached view therefore always matches the store order.
//! - Edge assembly uses the same `NameIndex` rule as live resolution.

use crate::graph::{GraphEdge, GraphEntities, GraphNode};
use crate::model::entry::{Entry, EntryId};
use crate::resolver::links::{extract_markers, NameEntry, NameIndex};
use dashmap::DashMap;
use log::info;
use std::collections::{BTreeMap, HashSet};

/// Cached per-entry state: display metadata plus normalized markers.
#[derive(Debug, Clone)]
struct NodeState {
    name: String,
    group_id: String,
    updated_at: i64,
    markers: Vec<String>,
}

impl NodeState {
    fn from_entry(entry: &Entry) -> Self {
        Self {
            name: entry.name.clone(),
            group_id: entry.group_id.clone(),
            updated_at: entry.updated_at,
            markers: extract_markers(&entry.content),
        }
    }
}

/// All cached entries for one organization, keyed by entry id.
///
/// `BTreeMap` gives deterministic (ascending-uuid) view assembly.
#[derive(Debug, Default)]
struct OrgGraph {
    nodes: BTreeMap<EntryId, NodeState>,
}

impl OrgGraph {
    fn name_entries(&self) -> Vec<NameEntry> {
        self.nodes
            .iter()
            .map(|(entry_id, state)| NameEntry {
                entry_id: *entry_id,
                name: state.name.clone(),
                updated_at: state.updated_at,
            })
            .collect()
    }

    fn entities(&self) -> GraphEntities {
        let names = self.name_entries();
        let index = NameIndex::new(&names);
        let mut entities = GraphEntities::default();

        for (entry_id, state) in &self.nodes {
            entities.nodes.push(GraphNode {
                entry_id: *entry_id,
                name: state.name.clone(),
                group_id: state.group_id.clone(),
            });

            let mut targets = HashSet::new();
            for marker in &state.markers {
                if let Some(target) = index.resolve(marker, Some(*entry_id)) {
                    if targets.insert(target.entry_id) {
                        entities.edges.push(GraphEdge {
                            source: *entry_id,
                            target: target.entry_id,
                        });
                    }
                }
            }
        }

        entities
    }

    fn backlinks(&self, target_id: EntryId) -> Vec<GraphNode> {
        let names = self.name_entries();
        let index = NameIndex::new(&names);
        let mut sources = Vec::new();

        for (entry_id, state) in &self.nodes {
            if *entry_id == target_id {
                continue;
            }
            let hits = state
                .markers
                .iter()
                .filter_map(|marker| index.resolve(marker, Some(*entry_id)))
                .any(|resolved| resolved.entry_id == target_id);
            if hits {
                sources.push(GraphNode {
                    entry_id: *entry_id,
                    name: state.name.clone(),
                    group_id: state.group_id.clone(),
                });
            }
        }

        sources
    }
}

/// Concurrent per-organization graph cache.
///
/// Reads on a cached organization take no locks beyond the shard guard;
/// writers go through the service layer's per-organization section.
#[derive(Debug, Default)]
pub struct GraphCache {
    orgs: DashMap<String, OrgGraph>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the organization has been loaded into the cache.
    pub fn contains(&self, org_id: &str) -> bool {
        self.orgs.contains_key(org_id)
    }

    /// Replaces the organization's cached state from store rows.
    pub fn rebuild(&self, org_id: &str, entries: &[Entry]) {
        let mut graph = OrgGraph::default();
        for entry in entries {
            graph.nodes.insert(entry.uuid, NodeState::from_entry(entry));
        }
        let node_count = graph.nodes.len();
        self.orgs.insert(org_id.to_string(), graph);
        info!(
            "event=graph_rebuild module=graph status=ok org_id={org_id} nodes={node_count}"
        );
    }

    /// Applies one create/update: only the mutated entry's text is
    /// re-scanned.
    ///
    /// A miss (organization not yet cached) is a no-op; the next read
    /// rebuilds from the store.
    pub fn apply_upsert(&self, entry: &Entry) {
        if let Some(mut graph) = self.orgs.get_mut(&entry.org_id) {
            graph.nodes.insert(entry.uuid, NodeState::from_entry(entry));
        }
    }

    /// Applies one delete: the node vanishes, and edge assembly on the next
    /// read demotes every reference that pointed at it.
    pub fn apply_deleted(&self, org_id: &str, entry_id: EntryId) {
        if let Some(mut graph) = self.orgs.get_mut(org_id) {
            graph.nodes.remove(&entry_id);
        }
    }

    /// Drops one organization entirely (group/organization cascade cleanup).
    pub fn invalidate(&self, org_id: &str) {
        self.orgs.remove(org_id);
    }

    /// Assembles the node/edge view for one organization.
    ///
    /// Returns `None` when the organization has not been loaded yet.
    pub fn entities(&self, org_id: &str) -> Option<GraphEntities> {
        self.orgs.get(org_id).map(|graph| graph.entities())
    }

    /// Entries whose resolved references currently target `entry_id`.
    pub fn backlinks(&self, org_id: &str, entry_id: EntryId) -> Option<Vec<GraphNode>> {
        self.orgs.get(org_id).map(|graph| graph.backlinks(entry_id))
    }
}

#[cfg(test)]
mod tests {
    use super::GraphCache;
    use crate::model::entry::Entry;
    use uuid::Uuid;

    fn entry(id: u128, name: &str, content: &str, updated_at: i64) -> Entry {
        let mut entry = Entry::with_id(
            Uuid::from_u128(id),
            "org-1",
            "grp-1",
            name,
            content,
            "user-1",
        );
        entry.updated_at = updated_at;
        entry
    }

    #[test]
    fn rebuild_assembles_nodes_and_edges() {
        let cache = GraphCache::new();
        let rows = vec![
            entry(1, "Budget", "totals", 100),
            entry(2, "Notes", "see [[Budget]]", 200),
        ];
        cache.rebuild("org-1", &rows);

        let entities = cache.entities("org-1").expect("org should be cached");
        assert_eq!(entities.nodes.len(), 2);
        assert_eq!(entities.edges.len(), 1);
        assert_eq!(entities.edges[0].source, Uuid::from_u128(2));
        assert_eq!(entities.edges[0].target, Uuid::from_u128(1));
    }

    #[test]
    fn delete_removes_node_and_demotes_edges() {
        let cache = GraphCache::new();
        cache.rebuild(
            "org-1",
            &[
                entry(1, "Budget", "totals", 100),
                entry(2, "Notes", "see [[Budget]]", 200),
            ],
        );

        cache.apply_deleted("org-1", Uuid::from_u128(1));
        let entities = cache.entities("org-1").expect("org should be cached");
        assert_eq!(entities.nodes.len(), 1);
        assert!(entities.edges.is_empty());
    }

    #[test]
    fn rename_demotes_references_without_rescanning_sources() {
        let cache = GraphCache::new();
        cache.rebuild(
            "org-1",
            &[
                entry(1, "Budget", "totals", 100),
                entry(2, "Notes", "see [[Budget]]", 200),
            ],
        );

        cache.apply_upsert(&entry(1, "Ledger", "totals", 300));

        let entities = cache.entities("org-1").expect("org should be cached");
        assert!(entities.edges.is_empty());
    }

    #[test]
    fn upsert_on_uncached_org_is_a_noop() {
        let cache = GraphCache::new();
        cache.apply_upsert(&entry(1, "Budget", "totals", 100));
        assert!(!cache.contains("org-1"));
        assert!(cache.entities("org-1").is_none());
    }

    #[test]
    fn backlinks_list_current_referrers_only() {
        let cache = GraphCache::new();
        cache.rebuild(
            "org-1",
            &[
                entry(1, "Budget", "totals", 100),
                entry(2, "Notes", "see [[Budget]]", 200),
                entry(3, "Minutes", "unrelated", 300),
            ],
        );

        let backlinks = cache
            .backlinks("org-1", Uuid::from_u128(1))
            .expect("org should be cached");
        assert_eq!(backlinks.len(), 1);
        assert_eq!(backlinks[0].entry_id, Uuid::from_u128(2));
    }

    #[test]
    fn no_self_edges_even_for_self_naming_markers() {
        let cache = GraphCache::new();
        cache.rebuild("org-1", &[entry(1, "Loop", "see [[Loop]]", 100)]);
        let entities = cache.entities("org-1").expect("org should be cached");
        assert!(entities.edges.is_empty());
    }
}
