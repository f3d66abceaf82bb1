//! Durable per-file fact storage.
//!
//! The index itself is in-memory. A [`FactStore`] keeps the last built
//! [`FileLinkFacts`] of every file so a new session can `load` instead of
//! rebuilding the workspace.
//!
//! # On-Disk Layout ([`JsonFactStore`])
//!
//! ```text
//! <root>/
//! ├── meta.json              # {"schema_version": "7"}
//! └── facts/
//!     └── <sha256(file id)>.json  # {"file": <id>, "facts": {...}}
//! ```
//!
//! Entry names are the hex SHA-256 of the file id, so every name has the same
//! length no matter how long the id is. The id itself is stored inside the
//! entry. Writes go through a temp file and a rename, so readers see either
//! the old or the new content.
//!
//! # Corruption
//!
//! An entry whose `file` can be read but whose `facts` cannot is reported by
//! [`enumerate`](FactStore::enumerate) as [`StoredFacts::Corrupt`]. An entry
//! with no readable `file` cannot be attributed to any file and is skipped
//! with a warning. Neither fails the whole enumeration.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::facts::{FileLinkFacts, SourceFileId};

// ============================================================================
// Store Trait
// ============================================================================

/// One persisted entry as read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredFacts {
    /// Decoded facts.
    Valid(FileLinkFacts),
    /// The entry exists but could not be decoded.
    Corrupt(String),
}

impl StoredFacts {
    /// Facts to load; corrupt entries count as contributing nothing.
    pub fn into_facts(self) -> FileLinkFacts {
        match self {
            StoredFacts::Valid(facts) => facts,
            StoredFacts::Corrupt(_) => FileLinkFacts::new(),
        }
    }
}

/// Durable storage of the last built facts for each file.
pub trait FactStore: Send {
    /// Schema version the stored data was written with, if any.
    fn schema_version(&self) -> StoreResult<Option<String>>;

    /// Delete all stored facts and stamp the store with `version`.
    fn reset(&mut self, version: &str) -> StoreResult<()>;

    fn get(&self, file: &SourceFileId) -> StoreResult<Option<FileLinkFacts>>;

    fn put(&mut self, file: &SourceFileId, facts: &FileLinkFacts) -> StoreResult<()>;

    /// Remove `file`. Removing an absent file is not an error.
    fn delete(&mut self, file: &SourceFileId) -> StoreResult<()>;

    /// Every stored entry, in no particular order.
    fn enumerate(&self) -> StoreResult<Vec<(SourceFileId, StoredFacts)>>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryFactStore {
    version: Option<String>,
    entries: HashMap<SourceFileId, FileLinkFacts>,
}

impl MemoryFactStore {
    pub fn new() -> Self {
        MemoryFactStore::default()
    }

    /// A store already stamped with `version`.
    pub fn with_version(version: impl Into<String>) -> Self {
        MemoryFactStore {
            version: Some(version.into()),
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FactStore for MemoryFactStore {
    fn schema_version(&self) -> StoreResult<Option<String>> {
        Ok(self.version.clone())
    }

    fn reset(&mut self, version: &str) -> StoreResult<()> {
        self.entries.clear();
        self.version = Some(version.to_string());
        Ok(())
    }

    fn get(&self, file: &SourceFileId) -> StoreResult<Option<FileLinkFacts>> {
        Ok(self.entries.get(file).cloned())
    }

    fn put(&mut self, file: &SourceFileId, facts: &FileLinkFacts) -> StoreResult<()> {
        self.entries.insert(file.clone(), facts.clone());
        Ok(())
    }

    fn delete(&mut self, file: &SourceFileId) -> StoreResult<()> {
        self.entries.remove(file);
        Ok(())
    }

    fn enumerate(&self) -> StoreResult<Vec<(SourceFileId, StoredFacts)>> {
        Ok(self
            .entries
            .iter()
            .map(|(file, facts)| (file.clone(), StoredFacts::Valid(facts.clone())))
            .collect())
    }
}

// ============================================================================
// JSON Directory Store
// ============================================================================

const META_FILE: &str = "meta.json";
const FACTS_DIR: &str = "facts";

#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    schema_version: String,
}

/// On-disk form of one entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    file: SourceFileId,
    facts: FileLinkFacts,
}

/// Just the owner of an entry, for entries whose facts do not decode.
#[derive(Debug, Deserialize)]
struct StoredEntryOwner {
    file: SourceFileId,
}

/// Store that keeps one JSON file per source file under a directory.
#[derive(Debug, Clone)]
pub struct JsonFactStore {
    root: PathBuf,
}

impl JsonFactStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(FACTS_DIR))?;
        debug!(root = %root.display(), "opened fact store");
        Ok(JsonFactStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn facts_dir(&self) -> PathBuf {
        self.root.join(FACTS_DIR)
    }

    /// Path of the entry holding `file`'s facts.
    pub fn entry_path(&self, file: &SourceFileId) -> PathBuf {
        self.facts_dir().join(entry_name(file))
    }
}

/// Fixed-length entry file name for `file`.
fn entry_name(file: &SourceFileId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file.as_str().as_bytes());
    format!("{}.json", hex::encode(hasher.finalize()))
}

/// Decode an entry, falling back to just its owner when the facts are bad.
fn decode_entry(content: &[u8]) -> Option<(SourceFileId, StoredFacts)> {
    match serde_json::from_slice::<StoredEntry>(content) {
        Ok(entry) => Some((entry.file, StoredFacts::Valid(entry.facts))),
        Err(e) => serde_json::from_slice::<StoredEntryOwner>(content)
            .ok()
            .map(|owner| (owner.file, StoredFacts::Corrupt(e.to_string()))),
    }
}

impl FactStore for JsonFactStore {
    fn schema_version(&self) -> StoreResult<Option<String>> {
        let path = self.root.join(META_FILE);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: StoreMeta =
            serde_json::from_slice(&content).map_err(|e| StoreError::Corrupt {
                path,
                reason: e.to_string(),
            })?;
        Ok(Some(meta.schema_version))
    }

    fn reset(&mut self, version: &str) -> StoreResult<()> {
        let facts_dir = self.facts_dir();
        if facts_dir.exists() {
            fs::remove_dir_all(&facts_dir)?;
        }
        fs::create_dir_all(&facts_dir)?;
        let meta = StoreMeta {
            schema_version: version.to_string(),
        };
        atomic_write(
            &self.root.join(META_FILE),
            &serde_json::to_vec_pretty(&meta)?,
        )?;
        debug!(root = %self.root.display(), version, "reset fact store");
        Ok(())
    }

    fn get(&self, file: &SourceFileId) -> StoreResult<Option<FileLinkFacts>> {
        match fs::read(self.entry_path(file)) {
            Ok(content) => {
                let entry: StoredEntry = serde_json::from_slice(&content)?;
                Ok((entry.file == *file).then_some(entry.facts))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&mut self, file: &SourceFileId, facts: &FileLinkFacts) -> StoreResult<()> {
        let content = serde_json::to_vec(&StoredEntry {
            file: file.clone(),
            facts: facts.clone(),
        })?;
        atomic_write(&self.entry_path(file), &content)?;
        Ok(())
    }

    fn delete(&mut self, file: &SourceFileId) -> StoreResult<()> {
        match fs::remove_file(self.entry_path(file)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn enumerate(&self) -> StoreResult<Vec<(SourceFileId, StoredFacts)>> {
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(self.facts_dir())? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                // Orphaned temp file from an interrupted write.
                continue;
            }
            let content = match fs::read(dir_entry.path()) {
                Ok(content) => content,
                Err(e) => {
                    warn!(entry = %name, error = %e, "skipping unreadable fact store entry");
                    continue;
                }
            };
            let Some((file, stored)) = decode_entry(&content) else {
                warn!(entry = %name, "skipping fact store entry with no owning file");
                continue;
            };
            if entry_name(&file) != name {
                warn!(entry = %name, file = %file, "skipping misplaced fact store entry");
                continue;
            }
            entries.push((file, stored));
        }
        Ok(entries)
    }
}

/// Write content to a file atomically using temp + rename.
///
/// The temp file name includes PID and timestamp to prevent collisions when
/// multiple processes write to the same store.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let pid = std::process::id();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        pid,
        timestamp
    ));
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> FileLinkFacts {
        let mut facts = FileLinkFacts::new();
        facts.add("OrderServiceTests", "OrderService");
        facts
    }

    #[test]
    fn memory_store_round_trips_entries() {
        let mut store = MemoryFactStore::new();
        let file = SourceFileId::new("a.cs");
        assert_eq!(store.schema_version().unwrap(), None);

        store.put(&file, &sample()).unwrap();
        assert_eq!(store.get(&file).unwrap(), Some(sample()));

        store.delete(&file).unwrap();
        assert!(store.is_empty());
        store.delete(&file).unwrap();
    }

    #[test]
    fn memory_store_reset_clears_and_stamps() {
        let mut store = MemoryFactStore::new();
        store.put(&SourceFileId::new("a.cs"), &sample()).unwrap();
        store.reset("7").unwrap();
        assert!(store.is_empty());
        assert_eq!(store.schema_version().unwrap().as_deref(), Some("7"));
    }

    #[test]
    fn json_store_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let file = SourceFileId::new("src/Tests/Order Tests.cs");
        {
            let mut store = JsonFactStore::open(temp.path()).unwrap();
            store.reset("7").unwrap();
            store.put(&file, &sample()).unwrap();
        }

        let store = JsonFactStore::open(temp.path()).unwrap();
        assert_eq!(store.schema_version().unwrap().as_deref(), Some("7"));
        assert_eq!(store.get(&file).unwrap(), Some(sample()));

        let entries = store.enumerate().unwrap();
        assert_eq!(entries, vec![(file, StoredFacts::Valid(sample()))]);
    }

    #[test]
    fn json_store_without_meta_has_no_version() {
        let temp = TempDir::new().unwrap();
        let store = JsonFactStore::open(temp.path()).unwrap();
        assert_eq!(store.schema_version().unwrap(), None);
        assert!(store.enumerate().unwrap().is_empty());
    }

    #[test]
    fn json_store_reports_corrupt_entries() {
        let temp = TempDir::new().unwrap();
        let mut store = JsonFactStore::open(temp.path()).unwrap();
        store.reset("7").unwrap();
        let good = SourceFileId::new("good.cs");
        let bad = SourceFileId::new("bad.cs");
        store.put(&good, &sample()).unwrap();
        fs::write(
            store.entry_path(&bad),
            br#"{"file": "bad.cs", "facts": [1, 2]}"#,
        )
        .unwrap();

        let mut entries = store.enumerate().unwrap();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, bad);
        assert!(matches!(entries[0].1, StoredFacts::Corrupt(_)));
        assert_eq!(entries[1].1, StoredFacts::Valid(sample()));
    }

    #[test]
    fn json_store_skips_entries_without_owner() {
        let temp = TempDir::new().unwrap();
        let mut store = JsonFactStore::open(temp.path()).unwrap();
        store.reset("7").unwrap();
        let good = SourceFileId::new("good.cs");
        store.put(&good, &sample()).unwrap();
        fs::write(store.entry_path(&SourceFileId::new("lost.cs")), b"{ not json").unwrap();
        fs::write(
            store.entry_path(&SourceFileId::new("moved.cs")),
            br#"{"file": "elsewhere.cs", "facts": {}}"#,
        )
        .unwrap();

        let entries = store.enumerate().unwrap();
        assert_eq!(entries, vec![(good, StoredFacts::Valid(sample()))]);
    }

    #[test]
    fn json_store_reset_removes_entries() {
        let temp = TempDir::new().unwrap();
        let mut store = JsonFactStore::open(temp.path()).unwrap();
        store.reset("6").unwrap();
        store.put(&SourceFileId::new("a.cs"), &sample()).unwrap();

        store.reset("7").unwrap();
        assert!(store.enumerate().unwrap().is_empty());
        assert_eq!(store.schema_version().unwrap().as_deref(), Some("7"));
    }

    #[test]
    fn corrupt_meta_is_an_error() {
        let temp = TempDir::new().unwrap();
        let store = JsonFactStore::open(temp.path()).unwrap();
        fs::write(temp.path().join(META_FILE), b"garbage").unwrap();
        assert!(matches!(
            store.schema_version(),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn entry_names_have_fixed_length() {
        let short = entry_name(&SourceFileId::new("a.cs"));
        let long = entry_name(&SourceFileId::new("d/".repeat(200) + "Ünïcode.cs"));
        assert_eq!(short.len(), 64 + ".json".len());
        assert_eq!(long.len(), short.len());
        assert_ne!(short, long);
    }

    #[test]
    fn json_store_round_trips_long_ids() {
        let temp = TempDir::new().unwrap();
        let file = SourceFileId::new(format!("{}/OrderServiceTests.cs", "Nested".repeat(60)));
        assert!(file.as_str().len() > 300);

        let mut store = JsonFactStore::open(temp.path()).unwrap();
        store.reset("7").unwrap();
        store.put(&file, &sample()).unwrap();

        assert_eq!(store.get(&file).unwrap(), Some(sample()));
        assert_eq!(
            store.enumerate().unwrap(),
            vec![(file.clone(), StoredFacts::Valid(sample()))]
        );
        store.delete(&file).unwrap();
        assert!(store.enumerate().unwrap().is_empty());
    }
}
