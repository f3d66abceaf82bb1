//! Host declaration model.
//!
//! These types describe the declaration tree of one source file as the host
//! sees it: nested namespaces and types, the marker applications attached to
//! each declaration, and the resolved form of every type reference used as a
//! marker argument.
//!
//! The host owns parsing and resolution. It hands the index a [`SourceFile`]
//! snapshot whenever a file changes; nothing here refers back to the host.
//!
//! # Resolution
//!
//! A [`TypeReference`] carries the text as written plus an optional
//! [`TypeElement`]. An unresolved reference has no target. Arguments the host
//! could not evaluate at all are [`MarkerArgument::Bad`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::facts::SourceFileId;

// ============================================================================
// Language
// ============================================================================

/// Declaration language of a source file.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Language {
    #[serde(rename = "csharp")]
    CSharp,
    #[serde(rename = "visual_basic")]
    VisualBasic,
    #[serde(rename = "fsharp")]
    FSharp,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::CSharp => "csharp",
            Language::VisualBasic => "visual_basic",
            Language::FSharp => "fsharp",
            Language::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csharp" | "c#" | "cs" => Ok(Language::CSharp),
            "visual_basic" | "vb" | "vbnet" => Ok(Language::VisualBasic),
            "fsharp" | "f#" | "fs" => Ok(Language::FSharp),
            other => Err(format!("unknown language '{}'", other)),
        }
    }
}

// ============================================================================
// Type References
// ============================================================================

/// A resolved type declaration.
///
/// Two elements are the same type when their qualified names match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeElement {
    /// Fully-qualified name, e.g. `Shop.Orders.OrderService`.
    pub qualified_name: String,
    /// Simple name, e.g. `OrderService`.
    pub name: String,
}

impl TypeElement {
    pub fn new(qualified_name: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        let name = qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&qualified_name)
            .to_string();
        TypeElement {
            qualified_name,
            name,
        }
    }

    /// Name used when presenting this type as a link target.
    ///
    /// This is the simple name so that it lines up with the local names
    /// recorded for declarations.
    pub fn presentable_name(&self) -> &str {
        &self.name
    }
}

/// A type used as a marker argument (`typeof(X)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeReference {
    /// The reference as written in source.
    pub written: String,
    /// Resolved declaration, if resolution succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TypeElement>,
}

impl TypeReference {
    /// A reference resolved to `qualified_name`.
    pub fn resolved(qualified_name: impl Into<String>) -> Self {
        let target = TypeElement::new(qualified_name);
        TypeReference {
            written: target.name.clone(),
            target: Some(target),
        }
    }

    pub fn unresolved(written: impl Into<String>) -> Self {
        TypeReference {
            written: written.into(),
            target: None,
        }
    }
}

// ============================================================================
// Marker Applications
// ============================================================================

/// Value of one marker argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MarkerArgument {
    /// A type reference.
    Type(TypeReference),
    /// An array of values, possibly nested.
    Array(Vec<MarkerArgument>),
    /// Any other constant (string, number, enum member).
    Constant(String),
    /// A value the host could not evaluate.
    Bad,
}

/// A named argument (`Name = value`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedArgument {
    pub name: String,
    pub value: MarkerArgument,
}

/// One application of an attribute-like marker to a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerApplication {
    /// Marker name as written, possibly qualified (`Testing.LinkedTo`).
    pub name: String,
    #[serde(default)]
    pub positional: Vec<MarkerArgument>,
    #[serde(default)]
    pub named: Vec<NamedArgument>,
}

impl MarkerApplication {
    pub fn new(name: impl Into<String>) -> Self {
        MarkerApplication {
            name: name.into(),
            positional: Vec::new(),
            named: Vec::new(),
        }
    }

    pub fn with_positional(mut self, value: MarkerArgument) -> Self {
        self.positional.push(value);
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: MarkerArgument) -> Self {
        self.named.push(NamedArgument {
            name: name.into(),
            value,
        });
        self
    }

    /// Last dotted segment of the written name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Kind of container a declaration is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    /// Namespace-like container: holds namespaces and types.
    Namespace,
    /// Type-like container: holds nested types.
    Type,
}

/// A declaration and everything nested in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    /// Simple name.
    pub name: String,
    /// Markers written on this declaration.
    #[serde(default)]
    pub markers: Vec<MarkerApplication>,
    /// Markers inherited from base declarations (already resolved by the host).
    #[serde(default)]
    pub inherited_markers: Vec<MarkerApplication>,
    #[serde(default)]
    pub members: Vec<Declaration>,
}

impl Declaration {
    pub fn namespace(name: impl Into<String>) -> Self {
        Declaration {
            kind: DeclarationKind::Namespace,
            name: name.into(),
            markers: Vec::new(),
            inherited_markers: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn type_decl(name: impl Into<String>) -> Self {
        Declaration {
            kind: DeclarationKind::Type,
            ..Declaration::namespace(name)
        }
    }

    pub fn with_marker(mut self, marker: MarkerApplication) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn with_inherited_marker(mut self, marker: MarkerApplication) -> Self {
        self.inherited_markers.push(marker);
        self
    }

    pub fn with_member(mut self, member: Declaration) -> Self {
        self.members.push(member);
        self
    }

    pub fn is_type(&self) -> bool {
        self.kind == DeclarationKind::Type
    }
}

/// Snapshot of one file's declaration tree.
///
/// The file root behaves as a namespace-like container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub id: SourceFileId,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

impl SourceFile {
    pub fn new(id: impl Into<SourceFileId>, language: Language) -> Self {
        SourceFile {
            id: id.into(),
            language,
            declarations: Vec::new(),
        }
    }

    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
