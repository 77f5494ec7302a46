//! Owned declaration tree lowered from the front end's syntax tree

use crate::types::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Declaration kinds the scanner can see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeclKind {
    Struct,
    Enum,
    Union,
    Trait,
    Fn,
    Const,
    Static,
    TypeAlias,
    Module,
    Impl,
    Field,
    Variant,
    Method,
    AssocConst,
    AssocType,
}

impl DeclKind {
    /// Members live inside another declaration rather than a module
    pub fn is_member(self) -> bool {
        matches!(
            self,
            DeclKind::Field
                | DeclKind::Variant
                | DeclKind::Method
                | DeclKind::AssocConst
                | DeclKind::AssocType
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Struct => "struct",
            DeclKind::Enum => "enum",
            DeclKind::Union => "union",
            DeclKind::Trait => "trait",
            DeclKind::Fn => "fn",
            DeclKind::Const => "const",
            DeclKind::Static => "static",
            DeclKind::TypeAlias => "type-alias",
            DeclKind::Module => "module",
            DeclKind::Impl => "impl",
            DeclKind::Field => "field",
            DeclKind::Variant => "variant",
            DeclKind::Method => "method",
            DeclKind::AssocConst => "assoc-const",
            DeclKind::AssocType => "assoc-type",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw argument tokens of an attribute, kept as text until the scanner evaluates them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeArgs {
    /// `#[name]`
    None,
    /// `#[name(...)]`, tokens between the delimiters
    List(String),
    /// `#[name = value]`
    Value(String),
}

/// One outer attribute on a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// Path as written, segments joined by `::`
    pub path: String,
    pub args: AttributeArgs,
    /// Full attribute text, e.g. `#[derive(Debug)]`
    pub text: String,
    pub span: Span,
}

/// Read-only view of a declaration owned by its [`super::Document`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    /// Enclosing module path, relative to the document root
    pub namespace: Vec<String>,
    /// Owning declaration name for members (`Foo` for `Foo::bar`)
    pub owner: Option<String>,
    pub span: Span,
    pub attributes: Vec<AttributeRecord>,
    /// Item source with its outer attributes removed
    pub source: String,
    pub children: Vec<Arc<Declaration>>,
}

impl Declaration {
    /// Fully qualified name: namespace, owner, then the declaration's own name
    pub fn qualified_name(&self) -> String {
        let mut segments: Vec<&str> = self.namespace.iter().map(String::as_str).collect();
        if let Some(owner) = &self.owner {
            segments.push(owner);
        }
        segments.push(&self.name);
        segments.join("::")
    }

    /// Attributes whose path is not in `exclude`, rendered as source text
    pub fn attributes_except<F>(&self, mut exclude: F) -> Vec<&str>
    where
        F: FnMut(&str) -> bool,
    {
        self.attributes
            .iter()
            .filter(|attr| !exclude(&attr.path))
            .map(|attr| attr.text.as_str())
            .collect()
    }

    pub fn has_attribute(&self, path: &str) -> bool {
        self.attributes.iter().any(|attr| attr.path == path)
    }
}

/// Pre-order walk over a declaration forest, parents before children
pub struct DeclarationWalk<'a> {
    stack: Vec<&'a Arc<Declaration>>,
}

impl<'a> DeclarationWalk<'a> {
    pub(crate) fn new(roots: &'a [Arc<Declaration>]) -> Self {
        DeclarationWalk {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for DeclarationWalk<'a> {
    type Item = &'a Arc<Declaration>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}
