//! Graph view assembly through the engine facade, including the lazy
//! per-organization cache fill.

use notegraph_core::db::open_db_in_memory;
use notegraph_core::{
    AccessGate, AttachmentError, AttachmentResult, AttachmentStore, EntryAction, EntryService,
    EntryUpdate, NewEntry,
};
use std::sync::Arc;

struct AllowAll;

impl AccessGate for AllowAll {
    fn authorize(&self, _user_id: &str, _org_id: &str, _action: EntryAction) -> bool {
        true
    }
}

struct NullFiles;

impl AttachmentStore for NullFiles {
    fn upload(&self, _bytes: &[u8], _file_name: &str) -> AttachmentResult<String> {
        Ok("blob-0".to_string())
    }

    fn download(&self, attachment_id: &str) -> AttachmentResult<Vec<u8>> {
        Err(AttachmentError::NotFound(attachment_id.to_string()))
    }

    fn delete(&self, _attachment_id: &str) -> AttachmentResult<()> {
        Ok(())
    }
}

fn engine() -> EntryService<AllowAll> {
    let conn = open_db_in_memory().unwrap();
    EntryService::new(conn, AllowAll, Arc::new(NullFiles))
}

fn new_entry(org: &str, group: &str, name: &str, content: &str) -> NewEntry {
    NewEntry {
        org_id: org.to_string(),
        group_id: group.to_string(),
        name: name.to_string(),
        content: content.to_string(),
        user_id: "user-1".to_string(),
        attachment_id: None,
    }
}

#[test]
fn graph_contains_nodes_and_resolved_edges_only() {
    let engine = engine();

    let budget = engine
        .create_entry(new_entry("org-1", "grp-1", "Budget", "totals"))
        .unwrap();
    let notes = engine
        .create_entry(new_entry(
            "org-1",
            "grp-2",
            "Notes",
            "see [[Budget]] and [[Missing]]",
        ))
        .unwrap();

    let entities = engine.graph_entities("org-1").unwrap();
    assert_eq!(entities.nodes.len(), 2);
    assert_eq!(entities.edges.len(), 1);
    assert_eq!(entities.edges[0].source, notes.uuid);
    assert_eq!(entities.edges[0].target, budget.uuid);
}

#[test]
fn graph_is_scoped_per_organization() {
    let engine = engine();

    engine
        .create_entry(new_entry("org-1", "grp-1", "Budget", ""))
        .unwrap();
    engine
        .create_entry(new_entry("org-2", "grp-1", "Roadmap", "see [[Budget]]"))
        .unwrap();

    let org_one = engine.graph_entities("org-1").unwrap();
    assert_eq!(org_one.nodes.len(), 1);
    assert!(org_one.edges.is_empty());

    // org-2's marker cannot reach org-1's Budget.
    let org_two = engine.graph_entities("org-2").unwrap();
    assert_eq!(org_two.nodes.len(), 1);
    assert!(org_two.edges.is_empty());
}

#[test]
fn delete_removes_the_node_and_its_incoming_edges() {
    let engine = engine();

    let budget = engine
        .create_entry(new_entry("org-1", "grp-1", "Budget", ""))
        .unwrap();
    engine
        .create_entry(new_entry("org-1", "grp-1", "Notes", "see [[Budget]]"))
        .unwrap();
    assert_eq!(engine.graph_entities("org-1").unwrap().edges.len(), 1);

    engine.delete_entry(budget.uuid, "grp-1", "user-1").unwrap();

    let entities = engine.graph_entities("org-1").unwrap();
    assert_eq!(entities.nodes.len(), 1);
    assert!(entities.edges.is_empty());
}

#[test]
fn content_update_rewires_edges_incrementally() {
    let engine = engine();

    engine
        .create_entry(new_entry("org-1", "grp-1", "Budget", ""))
        .unwrap();
    let roadmap = engine
        .create_entry(new_entry("org-1", "grp-1", "Roadmap", ""))
        .unwrap();
    let notes = engine
        .create_entry(new_entry("org-1", "grp-1", "Notes", "see [[Budget]]"))
        .unwrap();
    assert_eq!(engine.graph_entities("org-1").unwrap().edges.len(), 1);

    engine
        .update_entry(
            notes.uuid,
            EntryUpdate {
                content: Some("see [[Roadmap]]".to_string()),
                ..EntryUpdate::default()
            },
            "user-1",
        )
        .unwrap();

    let entities = engine.graph_entities("org-1").unwrap();
    assert_eq!(entities.edges.len(), 1);
    assert_eq!(entities.edges[0].source, notes.uuid);
    assert_eq!(entities.edges[0].target, roadmap.uuid);
}

#[test]
fn backlinks_report_current_referrers() {
    let engine = engine();

    let budget = engine
        .create_entry(new_entry("org-1", "grp-1", "Budget", ""))
        .unwrap();
    let notes = engine
        .create_entry(new_entry("org-1", "grp-1", "Notes", "see [[Budget]]"))
        .unwrap();
    engine
        .create_entry(new_entry("org-1", "grp-1", "Minutes", "unrelated"))
        .unwrap();

    let backlinks = engine.backlinks("org-1", budget.uuid).unwrap();
    assert_eq!(backlinks.len(), 1);
    assert_eq!(backlinks[0].entry_id, notes.uuid);
}

#[test]
fn renaming_the_target_clears_its_backlinks() {
    let engine = engine();

    let budget = engine
        .create_entry(new_entry("org-1", "grp-1", "Budget", ""))
        .unwrap();
    engine
        .create_entry(new_entry("org-1", "grp-1", "Notes", "see [[Budget]]"))
        .unwrap();
    assert_eq!(engine.backlinks("org-1", budget.uuid).unwrap().len(), 1);

    engine
        .update_entry(
            budget.uuid,
            EntryUpdate {
                name: Some("Ledger".to_string()),
                ..EntryUpdate::default()
            },
            "user-1",
        )
        .unwrap();

    assert!(engine.backlinks("org-1", budget.uuid).unwrap().is_empty());
}

#[test]
fn refresh_organization_rebuilds_from_the_store() {
    let engine = engine();

    let budget = engine
        .create_entry(new_entry("org-1", "grp-1", "Budget", ""))
        .unwrap();
    let notes = engine
        .create_entry(new_entry("org-1", "grp-1", "Notes", "see [[Budget]]"))
        .unwrap();
    assert_eq!(engine.graph_entities("org-1").unwrap().nodes.len(), 2);

    engine.refresh_organization("org-1").unwrap();

    let entities = engine.graph_entities("org-1").unwrap();
    assert_eq!(entities.nodes.len(), 2);
    assert_eq!(entities.edges.len(), 1);
    assert_eq!(entities.edges[0].source, notes.uuid);
    assert_eq!(entities.edges[0].target, budget.uuid);
}

#[test]
fn concurrent_updates_in_one_org_both_land_in_the_graph() {
    let engine = engine();

    let left = engine
        .create_entry(new_entry("org-1", "grp-1", "Left", ""))
        .unwrap();
    let right = engine
        .create_entry(new_entry("org-1", "grp-1", "Right", ""))
        .unwrap();
    let anchor = engine
        .create_entry(new_entry("org-1", "grp-1", "Anchor", ""))
        .unwrap();
    assert!(engine.graph_entities("org-1").unwrap().edges.is_empty());

    std::thread::scope(|scope| {
        for id in [left.uuid, right.uuid] {
            let engine = &engine;
            scope.spawn(move || {
                engine
                    .update_entry(
                        id,
                        EntryUpdate {
                            content: Some("see [[Anchor]]".to_string()),
                            ..EntryUpdate::default()
                        },
                        "user-1",
                    )
                    .unwrap();
            });
        }
    });

    let entities = engine.graph_entities("org-1").unwrap();
    assert_eq!(entities.edges.len(), 2);
    assert!(entities
        .edges
        .iter()
        .all(|edge| edge.target == anchor.uuid));
}
