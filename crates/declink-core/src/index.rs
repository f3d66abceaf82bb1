//! The incremental, bidirectional link index.
//!
//! [`GlobalLinkIndex`] keeps two maps for one workspace session:
//!
//! - `previous_names`: file → every name (local or linked) the file's last
//!   contribution touched. Used only to remove that contribution again.
//! - `linked_names`: name → set of [`LinkedName`] `(file, other name)`. Every
//!   fact `(file, A, B)` is stored in both directions.
//!
//! # Lifecycle
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`load`](GlobalLinkIndex::load) | Reset, then fold persisted per-file facts in |
//! | [`build`](GlobalLinkIndex::build) | Compute a file's facts; no mutation |
//! | [`merge`](GlobalLinkIndex::merge) | Replace a file's contribution (`None` is a no-op) |
//! | [`drop_file`](GlobalLinkIndex::drop_file) | Remove a file's contribution and stop tracking it |
//! | [`query`](GlobalLinkIndex::query) | Look up the links of a name |
//!
//! Each file's contribution is scoped to entries tagged with that file, so
//! contributions commute: loading or merging files in any order yields the
//! same [`LinkIndexState`].
//!
//! # Concurrency
//!
//! `build` and `query` take `&self`; `load`, `merge`, `drop_file` take
//! `&mut self`. Hosts that share an index across threads wrap it in a lock and
//! build outside the critical section.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, trace};

use crate::declaration::{Language, SourceFile};
use crate::facts::{FileLinkFacts, LinkedName, SourceFileId};
use crate::indexer::PerFileIndexer;

// ============================================================================
// State
// ============================================================================

/// The two maps of the index.
///
/// Exposed read-only so callers can compare states, e.g. after replaying the
/// same contributions in different orders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkIndexState {
    previous_names: HashMap<SourceFileId, HashSet<String>>,
    linked_names: HashMap<String, BTreeSet<LinkedName>>,
}

impl LinkIndexState {
    /// Names recorded for `file` by its last contribution.
    pub fn previous_names(&self, file: &SourceFileId) -> Option<&HashSet<String>> {
        self.previous_names.get(file)
    }

    /// Entries stored under `name`.
    pub fn linked_names(&self, name: &str) -> Option<&BTreeSet<LinkedName>> {
        self.linked_names.get(name)
    }

    /// All `(name, entries)` pairs, unordered.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<LinkedName>)> {
        self.linked_names.iter()
    }

    /// Add `facts` for `file` and record the names it touched.
    ///
    /// The caller guarantees nothing tagged with `file` is present.
    fn add_file(&mut self, file: &SourceFileId, facts: &FileLinkFacts) {
        let mut touched = HashSet::new();
        for (local, linked) in facts.iter() {
            touched.insert(local.clone());
            for other in linked {
                touched.insert(other.clone());
                self.linked_names
                    .entry(local.clone())
                    .or_default()
                    .insert(LinkedName::new(file.clone(), other.clone()));
                self.linked_names
                    .entry(other.clone())
                    .or_default()
                    .insert(LinkedName::new(file.clone(), local.clone()));
            }
        }
        self.previous_names.insert(file.clone(), touched);
    }

    /// Remove every entry tagged with `file`, reachable from its recorded
    /// names. Returns the number of entries removed.
    fn remove_file(&mut self, file: &SourceFileId) -> usize {
        let Some(names) = self.previous_names.remove(file) else {
            return 0;
        };
        let mut removed = 0;
        for name in names {
            // Absent names are fine: nothing left to clear.
            let Some(entries) = self.linked_names.get_mut(&name) else {
                continue;
            };
            let before = entries.len();
            entries.retain(|entry| &entry.file != file);
            removed += before - entries.len();
            if entries.is_empty() {
                self.linked_names.remove(&name);
            }
        }
        removed
    }
}

// ============================================================================
// Global Link Index
// ============================================================================

/// Incremental cache of links between declarations across a workspace.
///
/// Constructed once per session and discarded at session end.
#[derive(Debug, Clone)]
pub struct GlobalLinkIndex {
    indexer: PerFileIndexer,
    languages: BTreeSet<Language>,
    state: LinkIndexState,
}

impl GlobalLinkIndex {
    /// Create an empty index that builds with `indexer` and accepts files in
    /// `languages`.
    pub fn new(indexer: PerFileIndexer, languages: impl IntoIterator<Item = Language>) -> Self {
        GlobalLinkIndex {
            indexer,
            languages: languages.into_iter().collect(),
            state: LinkIndexState::default(),
        }
    }

    pub fn indexer(&self) -> &PerFileIndexer {
        &self.indexer
    }

    /// Whether `file` is in a supported declaration language.
    pub fn is_applicable(&self, file: &SourceFile) -> bool {
        self.languages.contains(&file.language)
    }

    /// Reset to empty and fold in persisted per-file facts.
    ///
    /// Order does not matter. A file listed twice keeps its last facts.
    pub fn load<I>(&mut self, per_file: I)
    where
        I: IntoIterator<Item = (SourceFileId, FileLinkFacts)>,
    {
        self.state = LinkIndexState::default();
        for (file, facts) in per_file {
            // Repeated ids replace rather than accumulate.
            self.state.remove_file(&file);
            self.state.add_file(&file, &facts);
        }
        debug!(
            files = self.state.previous_names.len(),
            names = self.state.linked_names.len(),
            "link index loaded"
        );
    }

    /// Compute the facts `file` contributes in its current state.
    pub fn build(&self, file: &SourceFile) -> FileLinkFacts {
        self.indexer.build(file)
    }

    /// Replace `file`'s contribution with `facts`.
    ///
    /// `None` leaves the existing contribution untouched. An empty
    /// `FileLinkFacts` clears it while keeping the file tracked.
    pub fn merge(&mut self, file: &SourceFileId, facts: Option<&FileLinkFacts>) {
        let Some(facts) = facts else {
            trace!(file = %file, "merge skipped");
            return;
        };
        let removed = self.state.remove_file(file);
        self.state.add_file(file, facts);
        trace!(file = %file, removed, added = facts.fact_count(), "merged file facts");
    }

    /// Remove `file`'s contribution and stop tracking it.
    pub fn drop_file(&mut self, file: &SourceFileId) {
        let removed = self.state.remove_file(file);
        trace!(file = %file, removed, "dropped file");
    }

    /// Every `(file, other name)` linked with `name`, in sorted order.
    pub fn query(&self, name: &str) -> Vec<LinkedName> {
        self.state
            .linked_names
            .get(name)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `file` currently has a recorded contribution.
    pub fn is_tracked(&self, file: &SourceFileId) -> bool {
        self.state.previous_names.contains_key(file)
    }

    /// Tracked files, sorted.
    pub fn files(&self) -> Vec<&SourceFileId> {
        let mut files: Vec<_> = self.state.previous_names.keys().collect();
        files.sort();
        files
    }

    pub fn file_count(&self) -> usize {
        self.state.previous_names.len()
    }

    /// Number of distinct names with at least one link.
    pub fn name_count(&self) -> usize {
        self.state.linked_names.len()
    }

    pub fn state(&self) -> &LinkIndexState {
        &self.state
    }

    /// Discard all contributions.
    pub fn clear(&mut self) {
        self.state = LinkIndexState::default();
    }
}

// ============================================================================
// Tests
// ============================================================================
