//! Link facts: the per-file data contributed to the link index.
//!
//! A file contributes a [`FileLinkFacts`] value: a mapping from the simple
//! name of each declaration in the file to the set of names that declaration
//! links to. The value is recomputed from scratch on every build and carries
//! no history.
//!
//! Names are simple (unqualified) declaration names. Two declarations with the
//! same simple name in different namespaces share one key; this is a known
//! limitation of the index.
//!
//! # Schema Versioning
//!
//! [`LINK_FACTS_SCHEMA_VERSION`] tags persisted facts. A store carrying any
//! other tag is discarded and every applicable file is rebuilt.

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// Schema Version
// ============================================================================

/// Schema version for persisted [`FileLinkFacts`].
///
/// Increment this when the serialized shape of `FileLinkFacts` changes or
/// when extraction semantics change enough that old facts are wrong.
pub const LINK_FACTS_SCHEMA_VERSION: &str = "7";

// ============================================================================
// File Identity
// ============================================================================

/// Stable identity of a source file, supplied by the host.
///
/// Usually a workspace-relative path. Stable across edits of the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceFileId(pub String);

impl SourceFileId {
    /// Create a new file ID.
    pub fn new(id: impl Into<String>) -> Self {
        SourceFileId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SourceFileId {
    fn from(id: String) -> Self {
        SourceFileId(id)
    }
}

impl From<&str> for SourceFileId {
    fn from(id: &str) -> Self {
        SourceFileId::new(id)
    }
}

// ============================================================================
// Facts
// ============================================================================

/// A single `(local, linked)` pair discovered in one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkFact {
    /// Name of the declaration carrying the marker.
    pub local: String,
    /// Name the marker links to.
    pub linked: String,
}

/// Everything one file contributes, keyed by local declaration name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileLinkFacts(BTreeMap<String, BTreeSet<String>>);

impl FileLinkFacts {
    pub fn new() -> Self {
        FileLinkFacts::default()
    }

    /// Record that `local` links to `linked`. Repeated pairs collapse.
    pub fn add(&mut self, local: impl Into<String>, linked: impl Into<String>) {
        self.0
            .entry(local.into())
            .or_default()
            .insert(linked.into());
    }

    /// Add every name in `linked` under `local`.
    ///
    /// An empty iterator leaves no entry behind.
    pub fn extend<I, S>(&mut self, local: &str, linked: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in linked {
            self.add(local, name);
        }
    }

    /// Linked names recorded for `local`.
    pub fn linked(&self, local: &str) -> Option<&BTreeSet<String>> {
        self.0.get(local)
    }

    /// Iterate `(local, linked set)` entries in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, BTreeSet<String>> {
        self.0.iter()
    }

    /// Flatten into individual facts.
    pub fn iter_facts(&self) -> impl Iterator<Item = LinkFact> + '_ {
        self.0.iter().flat_map(|(local, linked)| {
            linked.iter().map(move |name| LinkFact {
                local: local.clone(),
                linked: name.clone(),
            })
        })
    }

    /// Every name this file touches, local or linked.
    pub fn names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for (local, linked) in &self.0 {
            names.insert(local.clone());
            names.extend(linked.iter().cloned());
        }
        names
    }

    /// Number of local names with at least one recorded entry.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of `(local, linked)` pairs.
    pub fn fact_count(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }
}

impl FromIterator<LinkFact> for FileLinkFacts {
    fn from_iter<T: IntoIterator<Item = LinkFact>>(iter: T) -> Self {
        let mut facts = FileLinkFacts::new();
        for fact in iter {
            facts.add(fact.local, fact.linked);
        }
        facts
    }
}

// ============================================================================
// Query Results
// ============================================================================

/// One entry of the global index: the other end of a link, and which file
/// recorded it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkedName {
    /// File whose contribution produced this link.
    pub file: SourceFileId,
    /// Name on the other end of the link.
    pub name: String,
}

impl LinkedName {
    pub fn new(file: SourceFileId, name: impl Into<String>) -> Self {
        LinkedName {
            file,
            name: name.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
