//! Entry mutation/read orchestration.
//!
//! # Responsibility
//! - Run every mutation as authorize → store write → graph apply →
//!   broadcast, serialized per organization.
//! - Serve reference-aware reads (entry views, live resolution, graph
//!   entities) without blocking writers on other organizations.
//!
//! # Invariants
//! - A denied or failed mutation leaves no graph update and no broadcast.
//! - Broadcasts happen inside the per-organization section, so subscribers
//!   observe one organization's events in true mutation order.
//! - Reads on cached organizations take no per-organization lock.

use crate::access::{AccessGate, EntryAction, Unauthorized};
use crate::files::{AttachmentError, AttachmentStore};
use crate::graph::cache::GraphCache;
use crate::graph::{GraphEntities, GraphNode};
use crate::hub::dispatch::EntryHub;
use crate::model::entry::{Entry, EntryId, EntryUpdate};
use crate::model::event::{ChangeEvent, ChangeKind};
use crate::repo::entry_repo::{EntryRepository, SqliteEntryRepository, StoreError};
use crate::resolver::links::{resolve_markers, EntryLinks, NameEntry};
use dashmap::DashMap;
use log::{error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Service error for entry use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Access gate denied the action; nothing was mutated or broadcast.
    Unauthorized(Unauthorized),
    /// Name collision within the target group; the store is unchanged.
    DuplicateName { name: String, group_id: String },
    /// Target entry absent (or outside the caller's scope).
    NotFound(EntryId),
    /// Backing persistence failed; retry the whole operation.
    Store(StoreError),
    /// External attachment store failed.
    Attachment(AttachmentError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized(denial) => write!(f, "{denial}"),
            Self::DuplicateName { name, group_id } => {
                write!(f, "entry name `{name}` already used in group `{group_id}`")
            }
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Attachment(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unauthorized(denial) => Some(denial),
            Self::Store(err) => Some(err),
            Self::Attachment(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateName { name, group_id } => {
                Self::DuplicateName { name, group_id }
            }
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<AttachmentError> for ServiceError {
    fn from(value: AttachmentError) -> Self {
        Self::Attachment(value)
    }
}

/// Request model for entry creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub org_id: String,
    pub group_id: String,
    pub name: String,
    pub content: String,
    pub user_id: String,
    /// Identifier previously returned by the attachment store, if the
    /// client uploaded a file before saving.
    pub attachment_id: Option<String>,
}

/// Read model bundling an entry with its current reference resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryView {
    pub entry: Entry,
    pub links: EntryLinks,
}

/// Engine facade over gate, store, resolver, graph cache and hub.
///
/// The SQLite connection sits behind one mutex; per-organization mutexes
/// serialize the mutation pipeline so different organizations proceed in
/// parallel while one organization's events stay ordered.
pub struct EntryService<G: AccessGate> {
    conn: Mutex<Connection>,
    org_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    graph: GraphCache,
    hub: EntryHub,
    gate: G,
    files: Arc<dyn AttachmentStore>,
}

impl<G: AccessGate> EntryService<G> {
    /// Builds the engine over a migrated connection.
    pub fn new(conn: Connection, gate: G, files: Arc<dyn AttachmentStore>) -> Self {
        Self {
            conn: Mutex::new(conn),
            org_locks: DashMap::new(),
            graph: GraphCache::new(),
            hub: EntryHub::new(),
            gate,
            files,
        }
    }

    /// Subscription/broadcast hub, exposed for connection transports.
    pub fn hub(&self) -> &EntryHub {
        &self.hub
    }

    /// Creates one entry, updates the graph and notifies subscribers.
    pub fn create_entry(&self, request: NewEntry) -> Result<Entry, ServiceError> {
        self.authorize(&request.user_id, &request.org_id, EntryAction::Create)?;
        let _section = self.org_section(&request.org_id);

        let mut entry = Entry::new(
            request.org_id.clone(),
            request.group_id,
            request.name,
            request.content,
            request.user_id,
        );
        entry.attachment_id = request.attachment_id;

        let stored = {
            let conn = self.lock_conn();
            let repo = SqliteEntryRepository::new(&conn);
            let id = repo.create_entry(&entry)?;
            repo.get_entry(id)?.ok_or(StoreError::NotFound(id))?
        };

        self.graph.apply_upsert(&stored);
        self.hub
            .broadcast(&ChangeEvent::now(&stored.org_id, stored.uuid, ChangeKind::Created));
        info!(
            "event=entry_create module=service status=ok org_id={} entry_id={}",
            stored.org_id, stored.uuid
        );
        Ok(stored)
    }

    /// Applies a partial update, re-resolves the entry's links and notifies
    /// subscribers.
    pub fn update_entry(
        &self,
        id: EntryId,
        update: EntryUpdate,
        user_id: &str,
    ) -> Result<Entry, ServiceError> {
        let current = self.require_entry(id)?;
        self.authorize(user_id, &current.org_id, EntryAction::Update)?;
        let _section = self.org_section(&current.org_id);

        let stored = {
            let conn = self.lock_conn();
            let repo = SqliteEntryRepository::new(&conn);
            repo.update_entry(id, &update)?
        };

        self.graph.apply_upsert(&stored);
        self.hub
            .broadcast(&ChangeEvent::now(&stored.org_id, stored.uuid, ChangeKind::Updated));
        info!(
            "event=entry_update module=service status=ok org_id={} entry_id={}",
            stored.org_id, stored.uuid
        );
        Ok(stored)
    }

    /// Deletes one entry and notifies subscribers.
    ///
    /// Absent ids surface `NotFound`; callers may treat that as an
    /// idempotent success. No event is broadcast for no-op deletes.
    pub fn delete_entry(
        &self,
        id: EntryId,
        group_id: &str,
        user_id: &str,
    ) -> Result<(), ServiceError> {
        let current = self.require_scoped(id, group_id)?;
        self.authorize(user_id, &current.org_id, EntryAction::Delete)?;
        let _section = self.org_section(&current.org_id);

        let removed = {
            let conn = self.lock_conn();
            let repo = SqliteEntryRepository::new(&conn);
            repo.delete_entry(id)?
        };

        if let Some(attachment_id) = removed.attachment_id.as_deref() {
            self.discard_attachment(attachment_id);
        }

        self.graph.apply_deleted(&removed.org_id, removed.uuid);
        self.hub
            .broadcast(&ChangeEvent::now(&removed.org_id, removed.uuid, ChangeKind::Deleted));
        info!(
            "event=entry_delete module=service status=ok org_id={} entry_id={}",
            removed.org_id, removed.uuid
        );
        Ok(())
    }

    /// Removes one entry's attachment reference and deletes the blob.
    ///
    /// An entry without an attachment is returned unchanged and no event is
    /// broadcast.
    pub fn delete_attachment(
        &self,
        id: EntryId,
        group_id: &str,
        user_id: &str,
    ) -> Result<Entry, ServiceError> {
        let current = self.require_scoped(id, group_id)?;
        self.authorize(user_id, &current.org_id, EntryAction::Update)?;

        let Some(attachment_id) = current.attachment_id.clone() else {
            return Ok(current);
        };

        let _section = self.org_section(&current.org_id);

        match self.files.delete(&attachment_id) {
            Ok(()) | Err(AttachmentError::NotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let stored = {
            let conn = self.lock_conn();
            let repo = SqliteEntryRepository::new(&conn);
            repo.clear_attachment(id)?
        };

        self.graph.apply_upsert(&stored);
        self.hub
            .broadcast(&ChangeEvent::now(&stored.org_id, stored.uuid, ChangeKind::Updated));
        info!(
            "event=attachment_delete module=service status=ok org_id={} entry_id={}",
            stored.org_id, stored.uuid
        );
        Ok(stored)
    }

    /// Gets one entry with its current resolved references and candidates.
    pub fn get_entry(&self, id: EntryId, org_id: &str) -> Result<EntryView, ServiceError> {
        let (entry, names) = {
            let conn = self.lock_conn();
            let repo = SqliteEntryRepository::new(&conn);
            let entry = repo
                .get_entry(id)?
                .filter(|entry| entry.org_id == org_id)
                .ok_or(ServiceError::NotFound(id))?;
            let names = org_names(&repo, org_id)?;
            (entry, names)
        };

        let links = resolve_markers(&entry.content, &names, Some(entry.uuid));
        Ok(EntryView { entry, links })
    }

    /// Lists one group's entries, newest first.
    pub fn list_entries(&self, org_id: &str, group_id: &str) -> Result<Vec<Entry>, ServiceError> {
        let conn = self.lock_conn();
        let repo = SqliteEntryRepository::new(&conn);
        Ok(repo.list_by_group(org_id, group_id)?)
    }

    /// Resolves arbitrary text against an organization's current names.
    ///
    /// Live authoring feedback: the text has not been saved, so `exclude`
    /// carries the entry currently being edited, if any.
    pub fn find_references(
        &self,
        org_id: &str,
        text: &str,
        exclude: Option<EntryId>,
    ) -> Result<EntryLinks, ServiceError> {
        let names = {
            let conn = self.lock_conn();
            let repo = SqliteEntryRepository::new(&conn);
            org_names(&repo, org_id)?
        };

        Ok(resolve_markers(text, &names, exclude))
    }

    /// Full node/edge view for visualization.
    ///
    /// Served from the incremental cache; the first read per organization
    /// rebuilds from the store.
    pub fn graph_entities(&self, org_id: &str) -> Result<GraphEntities, ServiceError> {
        if let Some(entities) = self.graph.entities(org_id) {
            return Ok(entities);
        }

        // Cache miss: rebuild inside the org section so a concurrent writer
        // cannot interleave between the store read and the cache fill.
        let _section = self.org_section(org_id);
        if let Some(entities) = self.graph.entities(org_id) {
            return Ok(entities);
        }

        let entries = {
            let conn = self.lock_conn();
            let repo = SqliteEntryRepository::new(&conn);
            repo.list_by_organization(org_id)?
        };
        self.graph.rebuild(org_id, &entries);

        Ok(self.graph.entities(org_id).unwrap_or_default())
    }

    /// Entries whose resolved references currently target `entry_id`.
    pub fn backlinks(
        &self,
        org_id: &str,
        entry_id: EntryId,
    ) -> Result<Vec<GraphNode>, ServiceError> {
        // Ensure the organization is cached, then read from the cache.
        self.graph_entities(org_id)?;
        Ok(self.graph.backlinks(org_id, entry_id).unwrap_or_default())
    }

    /// Re-syncs one organization's graph from the store.
    ///
    /// Called when an external collaborator mutated entries out of band
    /// (group cascade deletes); no events are broadcast, clients re-fetch.
    pub fn refresh_organization(&self, org_id: &str) -> Result<(), ServiceError> {
        let _section = self.org_section(org_id);
        let entries = {
            let conn = self.lock_conn();
            let repo = SqliteEntryRepository::new(&conn);
            repo.list_by_organization(org_id)?
        };
        self.graph.rebuild(org_id, &entries);
        Ok(())
    }

    fn authorize(
        &self,
        user_id: &str,
        org_id: &str,
        action: EntryAction,
    ) -> Result<(), ServiceError> {
        if self.gate.authorize(user_id, org_id, action) {
            return Ok(());
        }

        warn!(
            "event=access_denied module=service status=denied user_id={user_id} org_id={org_id} action={}",
            action.as_str()
        );
        Err(ServiceError::Unauthorized(Unauthorized {
            user_id: user_id.to_string(),
            org_id: org_id.to_string(),
            action,
        }))
    }

    /// Enters the per-organization serialization section.
    ///
    /// Mutations on one organization queue behind this guard; different
    /// organizations proceed fully in parallel.
    fn org_section(&self, org_id: &str) -> OwnedMutexGuard<()> {
        // The map entry's shard guard must drop before the wait below, or a
        // queued mutation stalls every organization on the same shard.
        let lock = self
            .org_locks
            .entry(org_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        lock.blocking_lock_owned()
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn require_entry(&self, id: EntryId) -> Result<Entry, ServiceError> {
        let conn = self.lock_conn();
        let repo = SqliteEntryRepository::new(&conn);
        repo.get_entry(id)?.ok_or(ServiceError::NotFound(id))
    }

    fn require_scoped(&self, id: EntryId, group_id: &str) -> Result<Entry, ServiceError> {
        let entry = self.require_entry(id)?;
        if entry.group_id != group_id {
            return Err(ServiceError::NotFound(id));
        }
        Ok(entry)
    }

    /// Best-effort blob cleanup during entry deletion; the entry mutation
    /// already committed, so store failures are logged, not surfaced.
    fn discard_attachment(&self, attachment_id: &str) {
        match self.files.delete(attachment_id) {
            Ok(()) | Err(AttachmentError::NotFound(_)) => {}
            Err(err) => {
                error!(
                    "event=attachment_delete module=service status=error attachment_id={attachment_id} error={err}"
                );
            }
        }
    }
}

fn org_names(
    repo: &SqliteEntryRepository<'_>,
    org_id: &str,
) -> Result<Vec<NameEntry>, StoreError> {
    Ok(repo
        .list_by_organization(org_id)?
        .iter()
        .map(NameEntry::from_entry)
        .collect())
}
