//! The link extractor capability.
//!
//! A [`LinkExtractor`] looks at one declaration and reports the names that
//! declaration links to. Extractors are pure: the same declaration always
//! yields the same names, and no state is kept between calls. Any number of
//! extractors can be registered with a
//! [`PerFileIndexer`](crate::indexer::PerFileIndexer); the indexer unions
//! their output.
//!
//! # Example Implementation
//!
//! ```
//! use declink_core::declaration::Declaration;
//! use declink_core::extractor::LinkExtractor;
//!
//! /// Links `FooTests` to `Foo` by naming convention.
//! struct SuffixExtractor;
//!
//! impl LinkExtractor for SuffixExtractor {
//!     fn id(&self) -> &str {
//!         "suffix"
//!     }
//!
//!     fn linked_names(&self, declaration: &Declaration) -> Vec<String> {
//!         declaration
//!             .name
//!             .strip_suffix("Tests")
//!             .filter(|subject| !subject.is_empty())
//!             .map(|subject| vec![subject.to_string()])
//!             .unwrap_or_default()
//!     }
//! }
//!
//! let names = SuffixExtractor.linked_names(&Declaration::type_decl("FooTests"));
//! assert_eq!(names, vec!["Foo".to_string()]);
//! ```

use std::sync::Arc;

use crate::declaration::{Declaration, TypeElement};

/// Produces linked names for a single declaration.
///
/// Implementations must be stateless per call and safe to share across
/// threads, since files are built in parallel.
pub trait LinkExtractor: Send + Sync {
    /// Short identifier used in logs.
    fn id(&self) -> &str;

    /// Names `declaration` links to. Unresolvable input is skipped, never
    /// reported.
    fn linked_names(&self, declaration: &Declaration) -> Vec<String>;

    /// Whether `declaration` links to the type `other`.
    ///
    /// Extractors that cannot answer type-level questions keep the default.
    fn is_linked_type(&self, declaration: &Declaration, other: &TypeElement) -> bool {
        let _ = (declaration, other);
        false
    }
}

/// Shared handle to a registered extractor.
pub type SharedExtractor = Arc<dyn LinkExtractor>;
