//! Per-file fact building.
//!
//! [`PerFileIndexer::build`] walks every type declaration in a file, asks each
//! registered extractor for linked names, and collects the result into a
//! fresh [`FileLinkFacts`]. Building is a pure function of the file snapshot
//! and the extractor set, so distinct files can be built in parallel.
//!
//! # Traversal
//!
//! Namespace-like containers yield their nested namespaces' types and their
//! own types. Type-like containers yield their nested types. Namespaces are
//! never handed to extractors.

use std::fmt;

use tracing::trace;

use crate::declaration::{Declaration, DeclarationKind, SourceFile};
use crate::extractor::SharedExtractor;
use crate::facts::FileLinkFacts;

// ============================================================================
// Declaration Traversal
// ============================================================================

/// Lazy iterator over all type declarations in a file.
///
/// Each call to [`type_declarations`] starts a new walk; no cursor is shared.
pub struct TypeDeclarations<'a> {
    stack: Vec<&'a Declaration>,
}

/// Iterate every type declaration in `file`, at any nesting depth.
pub fn type_declarations(file: &SourceFile) -> TypeDeclarations<'_> {
    TypeDeclarations {
        stack: file.declarations.iter().rev().collect(),
    }
}

impl<'a> Iterator for TypeDeclarations<'a> {
    type Item = &'a Declaration;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(decl) = self.stack.pop() {
            match decl.kind {
                DeclarationKind::Namespace => {
                    self.stack.extend(decl.members.iter().rev());
                }
                DeclarationKind::Type => {
                    // Namespaces cannot nest inside types.
                    self.stack.extend(
                        decl.members
                            .iter()
                            .rev()
                            .filter(|member| member.kind == DeclarationKind::Type),
                    );
                    return Some(decl);
                }
            }
        }
        None
    }
}

// ============================================================================
// Per-File Indexer
// ============================================================================

/// Builds the complete fact set of one file from the registered extractors.
#[derive(Clone, Default)]
pub struct PerFileIndexer {
    extractors: Vec<SharedExtractor>,
}

impl PerFileIndexer {
    pub fn new(extractors: Vec<SharedExtractor>) -> Self {
        PerFileIndexer { extractors }
    }

    /// Register another extractor.
    pub fn register(&mut self, extractor: SharedExtractor) {
        self.extractors.push(extractor);
    }

    pub fn extractors(&self) -> &[SharedExtractor] {
        &self.extractors
    }

    /// Compute the facts `file` contributes right now.
    pub fn build(&self, file: &SourceFile) -> FileLinkFacts {
        let mut facts = FileLinkFacts::new();
        for decl in type_declarations(file) {
            for extractor in &self.extractors {
                facts.extend(&decl.name, extractor.linked_names(decl));
            }
        }
        trace!(
            file = %file.id,
            locals = facts.len(),
            links = facts.fact_count(),
            "built file facts"
        );
        facts
    }
}

impl fmt::Debug for PerFileIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.extractors.iter().map(|e| e.id()).collect();
        f.debug_struct("PerFileIndexer")
            .field("extractors", &ids)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
