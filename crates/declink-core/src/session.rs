//! Session lifecycle: one link index bound to one fact store.
//!
//! A [`LinkSession`] is opened at workspace start and closed at workspace end.
//! It owns the [`GlobalLinkIndex`] and keeps the store in step with it:
//!
//! 1. On open: if the store's schema version matches
//!    [`LINK_FACTS_SCHEMA_VERSION`], load every persisted entry. Otherwise
//!    reset the store and report that a full rebuild is needed.
//! 2. On file change: build (pure), persist, merge.
//! 3. On file removal, or when a file stops being applicable: drop, delete.
//! 4. On close: discard the index.
//!
//! Store failures after open never abort indexing; they are logged and the
//! in-memory index is updated regardless.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::attribute::AttributeLinkExtractor;
use crate::config::LinkConfig;
use crate::declaration::{Declaration, SourceFile, TypeElement};
use crate::error::ConfigError;
use crate::extractor::SharedExtractor;
use crate::facts::{FileLinkFacts, LinkedName, SourceFileId, LINK_FACTS_SCHEMA_VERSION};
use crate::index::GlobalLinkIndex;
use crate::indexer::PerFileIndexer;
use crate::store::{FactStore, StoredFacts};
use std::sync::Arc;

// ============================================================================
// Session Status
// ============================================================================

/// How the session was initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Loaded from a compatible store.
    Loaded,
    /// Store was missing, unreadable, or from another schema; needs rebuild.
    Rebuild,
}

/// Summary of a session's index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub open_mode: OpenMode,
    pub files: usize,
    pub names: usize,
    pub marker_name: String,
}

/// Counts from a batch update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    /// Files built and merged.
    pub indexed: usize,
    /// Files skipped as not applicable.
    pub skipped: usize,
    /// Total `(local, linked)` pairs merged.
    pub links: usize,
}

// ============================================================================
// Link Session
// ============================================================================

/// A workspace session: the link index plus the store backing it.
pub struct LinkSession<S: FactStore> {
    index: GlobalLinkIndex,
    store: S,
    config: LinkConfig,
    open_mode: OpenMode,
}

impl<S: FactStore> LinkSession<S> {
    /// Open a session over `store`.
    ///
    /// The attribute extractor configured by `config` is always registered;
    /// `extra` extractors are registered after it.
    pub fn open(
        config: LinkConfig,
        mut store: S,
        extra: Vec<SharedExtractor>,
    ) -> Result<Self, ConfigError> {
        let attribute = AttributeLinkExtractor::new(&config.marker_name.value)?;
        let mut extractors: Vec<SharedExtractor> = vec![Arc::new(attribute)];
        extractors.extend(extra);
        let mut index = GlobalLinkIndex::new(
            PerFileIndexer::new(extractors),
            config.languages.value.iter().copied(),
        );

        let open_mode = match store.schema_version() {
            Ok(Some(version)) if version == LINK_FACTS_SCHEMA_VERSION => {
                match store.enumerate() {
                    Ok(entries) => {
                        index.load(entries.into_iter().map(|(file, stored)| {
                            if let StoredFacts::Corrupt(reason) = &stored {
                                warn!(file = %file, reason = %reason, "corrupt stored facts, loading as empty");
                            }
                            (file, stored.into_facts())
                        }));
                        OpenMode::Loaded
                    }
                    Err(e) => {
                        warn!(error = %e, "cannot enumerate fact store, rebuilding");
                        reset_store(&mut store);
                        OpenMode::Rebuild
                    }
                }
            }
            Ok(found) => {
                info!(
                    found = found.as_deref().unwrap_or("none"),
                    expected = LINK_FACTS_SCHEMA_VERSION,
                    "fact store schema mismatch, rebuilding"
                );
                reset_store(&mut store);
                OpenMode::Rebuild
            }
            Err(e) => {
                warn!(error = %e, "cannot read fact store version, rebuilding");
                reset_store(&mut store);
                OpenMode::Rebuild
            }
        };

        debug!(mode = ?open_mode, files = index.file_count(), "session opened");
        Ok(LinkSession {
            index,
            store,
            config,
            open_mode,
        })
    }

    /// Whether the caller must feed every applicable file to
    /// [`rebuild`](Self::rebuild).
    pub fn needs_rebuild(&self) -> bool {
        self.open_mode == OpenMode::Rebuild
    }

    pub fn index(&self) -> &GlobalLinkIndex {
        &self.index
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build many files in parallel, then persist and merge them one by one.
    pub fn rebuild(&mut self, files: &[SourceFile]) -> RebuildStats {
        let index = &self.index;
        let built: Vec<(&SourceFile, Option<FileLinkFacts>)> = files
            .par_iter()
            .map(|file| {
                let facts = index.is_applicable(file).then(|| index.build(file));
                (file, facts)
            })
            .collect();

        let mut stats = RebuildStats::default();
        for (file, facts) in built {
            match facts {
                Some(facts) => {
                    stats.indexed += 1;
                    stats.links += facts.fact_count();
                    self.commit(&file.id, facts);
                }
                None => {
                    stats.skipped += 1;
                    self.forget(&file.id);
                }
            }
        }
        self.open_mode = OpenMode::Loaded;
        info!(
            indexed = stats.indexed,
            skipped = stats.skipped,
            links = stats.links,
            "rebuild complete"
        );
        stats
    }

    /// Re-index one changed or added file.
    ///
    /// Returns the facts merged, or `None` if the file is not applicable.
    pub fn update_file(&mut self, file: &SourceFile) -> Option<FileLinkFacts> {
        if !self.index.is_applicable(file) {
            debug!(file = %file.id, language = %file.language, "file not applicable");
            self.forget(&file.id);
            return None;
        }
        let facts = self.index.build(file);
        self.commit(&file.id, facts.clone());
        Some(facts)
    }

    /// Forget a removed file.
    pub fn remove_file(&mut self, file: &SourceFileId) {
        self.index.drop_file(file);
        if let Err(e) = self.store.delete(file) {
            warn!(file = %file, error = %e, "cannot delete stored facts");
        }
    }

    /// Links of `name` in either direction.
    pub fn lookup(&self, name: &str) -> Vec<LinkedName> {
        self.index.query(name)
    }

    /// Whether any registered extractor links `declaration` to `other`.
    pub fn is_linked_type(&self, declaration: &Declaration, other: &TypeElement) -> bool {
        self.index
            .indexer()
            .extractors()
            .iter()
            .any(|extractor| extractor.is_linked_type(declaration, other))
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            open_mode: self.open_mode,
            files: self.index.file_count(),
            names: self.index.name_count(),
            marker_name: self.config.marker_name.value.clone(),
        }
    }

    /// End the session, returning the store.
    pub fn close(mut self) -> S {
        self.index.clear();
        debug!("session closed");
        self.store
    }

    fn commit(&mut self, file: &SourceFileId, facts: FileLinkFacts) {
        if let Err(e) = self.store.put(file, &facts) {
            warn!(file = %file, error = %e, "cannot persist facts");
        }
        self.index.merge(file, Some(&facts));
    }

    fn forget(&mut self, file: &SourceFileId) {
        if self.index.is_tracked(file) {
            self.remove_file(file);
        }
    }
}

fn reset_store<S: FactStore>(store: &mut S) {
    if let Err(e) = store.reset(LINK_FACTS_SCHEMA_VERSION) {
        warn!(error = %e, "cannot reset fact store");
    }
}

// ============================================================================
// Tests
// ============================================================================
