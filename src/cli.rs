//! CLI front door.
//!
//! Provides the command helpers behind the `declink` binary:
//! - `index` - Build and merge declaration snapshots
//! - `remove` - Drop files from the index
//! - `query` - Look up the links of a name
//! - `status` - Summarize the stored index
//!
//! ## Session Integration
//!
//! Every helper takes an open [`LinkSession`]. The caller (typically
//! `main.rs`) opens it with [`open_session`], which resolves configuration
//! and loads the store, and closes it when the command is done.
//!
//! ## Snapshot Input
//!
//! Declaration snapshots are JSON documents holding either one
//! [`SourceFile`] or an array of them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use declink_core::config::{CliOverrides, LinkConfig};
use declink_core::declaration::SourceFile;
use declink_core::error::DeclinkError;
use declink_core::facts::SourceFileId;
use declink_core::output::{IndexResponse, QueryResponse, RemoveResponse, StatusResponse};
use declink_core::session::LinkSession;
use declink_core::store::{FactStore, JsonFactStore};

/// Store directory name, relative to the workspace root.
pub const DEFAULT_STORE_DIR: &str = ".declink";

/// Where a command's session lives and how it is configured.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Workspace root; `declink.toml` is read from here.
    pub workspace: PathBuf,
    /// Store directory (default: `<workspace>/.declink`).
    pub store_dir: Option<PathBuf>,
    pub overrides: CliOverrides,
}

impl SessionOptions {
    pub fn store_dir(&self) -> PathBuf {
        self.store_dir
            .clone()
            .unwrap_or_else(|| self.workspace.join(DEFAULT_STORE_DIR))
    }
}

/// Resolve configuration and open the session stored on disk.
pub fn open_session(options: &SessionOptions) -> Result<LinkSession<JsonFactStore>, DeclinkError> {
    let config = LinkConfig::resolve(&options.workspace, &options.overrides)?;
    let store = JsonFactStore::open(options.store_dir())?;
    let session = LinkSession::open(config, store, Vec::new())?;
    debug!(store = %options.store_dir().display(), "opened session");
    Ok(session)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotInput {
    Many(Vec<SourceFile>),
    One(Box<SourceFile>),
}

/// Read declaration snapshots from a JSON file.
pub fn load_snapshots(path: &Path) -> Result<Vec<SourceFile>, DeclinkError> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => DeclinkError::file_not_found(path.display().to_string()),
        _ => DeclinkError::internal(format!("cannot read {}: {}", path.display(), e)),
    })?;
    let input: SnapshotInput = serde_json::from_str(&content).map_err(|e| {
        DeclinkError::invalid_args(format!("invalid snapshot {}: {}", path.display(), e))
    })?;
    Ok(match input {
        SnapshotInput::Many(files) => files,
        SnapshotInput::One(file) => vec![*file],
    })
}

/// Build and merge every snapshot in `paths`.
///
/// If the store was incompatible, the snapshots given here become the whole
/// index.
pub fn run_index<S: FactStore>(
    session: &mut LinkSession<S>,
    paths: &[PathBuf],
) -> Result<IndexResponse, DeclinkError> {
    let mut files = Vec::new();
    for path in paths {
        files.extend(load_snapshots(path)?);
    }
    let rebuilt = session.needs_rebuild();
    let stats = session.rebuild(&files);
    Ok(IndexResponse::new(stats, rebuilt))
}

/// Drop `ids` from the index and the store.
pub fn run_remove<S: FactStore>(session: &mut LinkSession<S>, ids: &[String]) -> RemoveResponse {
    let mut removed = Vec::new();
    for id in ids {
        let id = SourceFileId::new(id.as_str());
        if session.index().is_tracked(&id) {
            session.remove_file(&id);
            removed.push(id);
        }
    }
    RemoveResponse::new(removed)
}

pub fn run_query<S: FactStore>(
    session: &LinkSession<S>,
    name: &str,
) -> Result<QueryResponse, DeclinkError> {
    if name.trim().is_empty() {
        return Err(DeclinkError::invalid_args("name must not be empty"));
    }
    Ok(QueryResponse::new(name, session.lookup(name)))
}

pub fn run_status<S: FactStore>(session: &LinkSession<S>) -> Result<StatusResponse, DeclinkError> {
    let version = session.store().schema_version()?;
    Ok(StatusResponse::new(
        &session.status(),
        version.unwrap_or_else(|| "none".to_string()),
    ))
}

// ============================================================================
// Tests
// ============================================================================
