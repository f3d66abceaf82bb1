//! JSON output types for CLI responses.
//!
//! Every response is a JSON object with `status` as its first field and the
//! output `schema_version` second. Arrays are emitted in sorted order so the
//! same index state always produces the same bytes.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::DeclinkError;
use crate::facts::{LinkedName, SourceFileId};
use crate::session::{OpenMode, RebuildStats, SessionStatus};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Responses
// ============================================================================

/// Response for `declink index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub status: String,
    pub schema_version: String,
    /// True if the store was incompatible and every given file was rebuilt.
    pub rebuilt: bool,
    /// Files built and merged.
    pub indexed: usize,
    /// Files skipped as not applicable.
    pub skipped: usize,
    /// Total links merged.
    pub links: usize,
}

impl IndexResponse {
    pub fn new(stats: RebuildStats, rebuilt: bool) -> Self {
        IndexResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            rebuilt,
            indexed: stats.indexed,
            skipped: stats.skipped,
            links: stats.links,
        }
    }
}

/// Response for `declink remove`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveResponse {
    pub status: String,
    pub schema_version: String,
    /// Files whose contributions were dropped.
    pub removed: Vec<SourceFileId>,
}

impl RemoveResponse {
    pub fn new(mut removed: Vec<SourceFileId>) -> Self {
        removed.sort();
        removed.dedup();
        RemoveResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            removed,
        }
    }
}

/// Response for `declink query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub status: String,
    pub schema_version: String,
    /// The queried name.
    pub name: String,
    /// Links in either direction, sorted by file then name.
    pub links: Vec<LinkedName>,
}

impl QueryResponse {
    pub fn new(name: impl Into<String>, links: Vec<LinkedName>) -> Self {
        QueryResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            name: name.into(),
            links,
        }
    }
}

/// Response for `declink status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub schema_version: String,
    /// Persisted facts schema the store carries.
    pub facts_schema_version: String,
    /// Whether the index must be rebuilt from source before it is usable.
    pub needs_rebuild: bool,
    pub marker_name: String,
    pub files: usize,
    pub names: usize,
}

impl StatusResponse {
    pub fn new(status: &SessionStatus, facts_schema_version: impl Into<String>) -> Self {
        StatusResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            facts_schema_version: facts_schema_version.into(),
            needs_rebuild: status.open_mode == OpenMode::Rebuild,
            marker_name: status.marker_name.clone(),
            files: status.files,
            names: status.names,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error details for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, also used as the process exit status.
    pub code: u8,
    /// Machine-readable error kind.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl ErrorInfo {
    pub fn from_error(err: &DeclinkError) -> Self {
        ErrorInfo {
            code: err.error_code().code(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &DeclinkError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
