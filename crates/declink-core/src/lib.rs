//! Core infrastructure for declink.
//!
//! This crate maintains an incremental, bidirectional index of links between
//! declarations, where a link is declared by a marker applied to a type:
//! - Declaration model snapshots handed over by the host
//! - Link extractors, including the marker-attribute extractor
//! - Per-file fact building and the global link index
//! - Durable per-file fact stores
//! - Configuration resolution and session lifecycle
//! - Error types and JSON output types for CLI responses

pub mod attribute;
pub mod config;
pub mod declaration;
pub mod error;
pub mod extractor;
pub mod facts;
pub mod index;
pub mod indexer;
pub mod output;
pub mod session;
pub mod store;
