//! Source documents: parsing, fingerprinting and the owned declaration tree

pub mod builder;
pub mod context;
pub mod hasher;
pub mod model;

pub use context::DocumentContext;
pub use hasher::compute_fingerprint;
pub use model::{AttributeArgs, AttributeRecord, DeclKind, Declaration, DeclarationWalk};

use crate::error::SynthError;
use crate::types::{Fingerprint, Span};
use builder::DocumentBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Immutable parsed source unit.
///
/// A document is never edited in place. A save produces a new `Document` with a
/// new fingerprint, which supersedes the old one.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    source: Arc<str>,
    fingerprint: Fingerprint,
    roots: Vec<Arc<Declaration>>,
    /// `use` items per module path (`""` for the file root)
    uses: BTreeMap<String, Vec<String>>,
}

impl Document {
    /// Parse Rust source into a document
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<String>) -> Result<Self, SynthError> {
        let path = path.into();
        let source: String = source.into();
        let fingerprint = compute_fingerprint(&source);

        let file = syn::parse_file(&source).map_err(|e| SynthError::Parse {
            path: path.clone(),
            message: format!("{} at {}", e, Span::from(e.span())),
        })?;
        let (roots, uses) = DocumentBuilder::new().build(&file);

        Ok(Document {
            path,
            source: Arc::from(source),
            fingerprint,
            roots,
            uses,
        })
    }

    /// Read and parse a document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SynthError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        Self::parse(path, source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn roots(&self) -> &[Arc<Declaration>] {
        &self.roots
    }

    /// All declarations in document order, parents before their members
    pub fn declarations(&self) -> DeclarationWalk<'_> {
        DeclarationWalk::new(&self.roots)
    }

    /// `use` items in scope for a module path
    pub fn uses_in(&self, namespace: &[String]) -> &[String] {
        self.uses
            .get(&namespace.join("::"))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn uses(&self) -> &BTreeMap<String, Vec<String>> {
        &self.uses
    }
}
