//! declink: incremental bidirectional index of declaration links.
//!
//! A declaration marked with a configured attribute, such as
//! `[LinkedTo(typeof(OrderService))]`, is linked with every type passed to
//! that marker. The index answers "what is linked with this name?" in both
//! directions and is kept up to date one file at a time.

// Core infrastructure - re-exported from declink-core
pub use declink_core::attribute;
pub use declink_core::config;
pub use declink_core::declaration;
pub use declink_core::error;
pub use declink_core::extractor;
pub use declink_core::facts;
pub use declink_core::index;
pub use declink_core::indexer;
pub use declink_core::output;
pub use declink_core::session;
pub use declink_core::store;

// Front door
pub mod cli;
