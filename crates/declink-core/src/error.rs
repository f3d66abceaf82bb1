//! Error types and error code constants for declink.
//!
//! Indexing itself never fails: unresolvable input degrades to fewer links.
//! Errors only come from the edges of the system:
//! - [`StoreError`]: reading or writing persisted facts
//! - [`ConfigError`]: resolving configuration
//! - [`DeclinkError`]: the unified type rendered by the CLI
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller)
//! - `3`: Resolution errors (input file not found)
//! - `10`: Internal errors (I/O, corrupt state)

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigSource;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (file not found).
    ResolutionError = 3,
    /// Internal errors (I/O, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Store Errors
// ============================================================================

/// Errors from the durable fact store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error while reading or writing the store.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store metadata is unreadable.
    #[error("fact store is corrupt at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Config Errors
// ============================================================================

/// Errors while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Marker name is not usable.
    #[error("invalid marker name '{name}': {reason}")]
    InvalidMarkerName { name: String, reason: String },

    /// Language name not recognized.
    #[error("unknown language '{name}'")]
    UnknownLanguage { name: String },

    /// A language list resolved to no languages at all.
    #[error("no languages configured ({origin:?})")]
    NoLanguages { origin: ConfigSource },

    /// Project config file could not be parsed.
    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Project config file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum DeclinkError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Input file not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fact store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl From<&DeclinkError> for OutputErrorCode {
    fn from(err: &DeclinkError) -> Self {
        match err {
            DeclinkError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            DeclinkError::Config(_) => OutputErrorCode::InvalidArguments,
            DeclinkError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            DeclinkError::Store(_) => OutputErrorCode::InternalError,
            DeclinkError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl DeclinkError {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        DeclinkError::InvalidArguments {
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        DeclinkError::FileNotFound { path: path.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        DeclinkError::InternalError {
            message: message.into(),
        }
    }

    /// Short machine-readable kind for JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            DeclinkError::InvalidArguments { .. } => "invalid_arguments",
            DeclinkError::FileNotFound { .. } => "file_not_found",
            DeclinkError::Config(_) => "config",
            DeclinkError::Store(_) => "store",
            DeclinkError::InternalError { .. } => "internal",
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
