//! Marker extraction and reference resolution over entry text.
//!
//! # Responsibility
//! - Scan `[[Name]]` markers out of arbitrary text.
//! - Match markers against the organization's current entry names.
//!
//! # Invariants
//! - Output order follows first occurrence in the text; duplicates removed.
//! - Self-references are never resolved (the excluded entry id wins over a
//!   name match).
//! - Ambiguous markers resolve deterministically: most recently modified
//!   entry wins, ties break by ascending uuid.

use crate::model::entry::{normalize_name, Entry, EntryId};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").expect("valid marker regex"));

/// One entry name visible to the resolver.
///
/// A thin projection of [`Entry`] so resolution stays unit-testable without
/// the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub entry_id: EntryId,
    pub name: String,
    pub updated_at: i64,
}

impl NameEntry {
    /// Projects one stored entry into its resolver view.
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            entry_id: entry.uuid,
            name: entry.name.clone(),
            updated_at: entry.updated_at,
        }
    }
}

/// One marker that matched an existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedReference {
    /// Marker text as typed (trimmed).
    pub marker: String,
    /// Entry the marker resolved to.
    pub target_id: EntryId,
    /// The target's current display name.
    pub target_name: String,
}

/// Resolution output: matched references plus unmatched candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLinks {
    /// Markers that matched exactly one winning entry, first-occurrence order.
    pub resolved: Vec<ResolvedReference>,
    /// Markers with no matching entry name yet, first-occurrence order.
    ///
    /// Clients use these to offer "create entry" affordances.
    pub candidates: Vec<String>,
}

/// Extracts reference markers from text.
///
/// Returns trimmed marker text in first-occurrence order with duplicates
/// (case-insensitive) removed. Blank markers are dropped.
pub fn extract_markers(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut markers = Vec::new();

    for capture in MARKER_RE.captures_iter(text) {
        let raw = capture
            .get(1)
            .map(|group| group.as_str().trim())
            .unwrap_or_default();
        if raw.is_empty() {
            continue;
        }
        if seen.insert(normalize_name(raw)) {
            markers.push(raw.to_string());
        }
    }

    markers
}

/// Normalized-name lookup shared by live resolution and graph assembly.
///
/// Both paths must agree on the matching rule, so this is the single place
/// that ranks candidates for one name.
pub struct NameIndex<'a> {
    by_name: HashMap<String, Vec<&'a NameEntry>>,
}

impl<'a> NameIndex<'a> {
    /// Indexes the given names; candidates for one normalized name are kept
    /// winner-first.
    pub fn new(names: &'a [NameEntry]) -> Self {
        let mut by_name: HashMap<String, Vec<&NameEntry>> = HashMap::new();
        for candidate in names {
            let key = normalize_name(&candidate.name);
            if key.is_empty() {
                continue;
            }
            by_name.entry(key).or_default().push(candidate);
        }

        for candidates in by_name.values_mut() {
            candidates.sort_by(|a, b| {
                b.updated_at
                    .cmp(&a.updated_at)
                    .then_with(|| a.entry_id.cmp(&b.entry_id))
            });
        }

        Self { by_name }
    }

    /// Resolves one marker to its winning entry, skipping `exclude`.
    ///
    /// Returns `None` when no entry (other than the excluded one) carries
    /// the name. Ambiguous matches are logged and resolved to the ranked
    /// winner.
    pub fn resolve(&self, marker: &str, exclude: Option<EntryId>) -> Option<&'a NameEntry> {
        let key = normalize_name(marker);
        let candidates = self.by_name.get(key.as_str())?;
        let winner = candidates
            .iter()
            .find(|candidate| exclude != Some(candidate.entry_id))?;

        if candidates.len() > 1 {
            warn!(
                "event=reference_ambiguous module=resolver status=ok name={key} matches={} winner={}",
                candidates.len(),
                winner.entry_id
            );
        }

        Some(winner)
    }
}

/// Resolves every marker in `text` against the given name set.
///
/// `exclude` removes one entry (usually the one being edited) from the
/// candidate targets so an entry can never reference itself.
pub fn resolve_markers(text: &str, names: &[NameEntry], exclude: Option<EntryId>) -> EntryLinks {
    let index = NameIndex::new(names);
    let mut links = EntryLinks::default();
    let mut resolved_targets = HashSet::new();

    for marker in extract_markers(text) {
        match index.resolve(&marker, exclude) {
            Some(target) => {
                if resolved_targets.insert(target.entry_id) {
                    links.resolved.push(ResolvedReference {
                        marker,
                        target_id: target.entry_id,
                        target_name: target.name.clone(),
                    });
                }
            }
            None => links.candidates.push(marker),
        }
    }

    links
}
