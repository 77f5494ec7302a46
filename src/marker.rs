//! Generation markers: identities, sites and evaluated arguments

pub mod args;
pub mod catalog;

pub use args::{ConstValue, MarkerArgs};
pub use catalog::{MarkerCatalog, MarkerDefinition};

use crate::document::Declaration;
use crate::types::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Stable reference to a generator: the exported type name plus the module that
/// exports it. Two identities are equal iff both parts match exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneratorIdentity {
    pub type_ref: String,
    pub module: String,
}

impl GeneratorIdentity {
    pub fn new(type_ref: impl Into<String>, module: impl Into<String>) -> Self {
        GeneratorIdentity {
            type_ref: type_ref.into(),
            module: module.into(),
        }
    }
}

impl fmt::Display for GeneratorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.type_ref)
    }
}

/// Positional identity of one marker application within a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerSite {
    /// Document-order index across all recognized markers
    pub ordinal: usize,
    pub attribute: String,
    /// Qualified name of the marked declaration
    pub declaration: String,
    /// Index of the attribute among the declaration's outer attributes
    pub attribute_index: usize,
    pub span: Span,
}

impl fmt::Display for MarkerSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#[{}] on `{}` at {}",
            self.attribute, self.declaration, self.span
        )
    }
}

/// A recognized marker with its resolved identity and constant arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub identity: GeneratorIdentity,
    pub args: MarkerArgs,
    pub site: MarkerSite,
}

/// A declaration paired with one of its markers
#[derive(Debug, Clone)]
pub struct MarkedDeclaration {
    pub declaration: Arc<Declaration>,
    pub marker: Arc<Marker>,
}

impl MarkedDeclaration {
    pub fn site(&self) -> &MarkerSite {
        &self.marker.site
    }

    pub fn identity(&self) -> &GeneratorIdentity {
        &self.marker.identity
    }
}
