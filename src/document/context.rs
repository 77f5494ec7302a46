//! Read-only document context handed to generators

use super::model::{Declaration, DeclarationWalk};
use super::Document;
use crate::types::Fingerprint;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Surrounding information a generator may consult about its document.
///
/// Built once per regeneration and shared by every invocation through an `Arc`.
#[derive(Debug, Clone)]
pub struct DocumentContext {
    path: PathBuf,
    fingerprint: Fingerprint,
    roots: Vec<Arc<Declaration>>,
    uses: BTreeMap<String, Vec<String>>,
    by_name: HashMap<String, Arc<Declaration>>,
    marker_attributes: BTreeSet<String>,
}

impl DocumentContext {
    pub fn new<I, S>(document: &Document, marker_attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut by_name = HashMap::new();
        for decl in document.declarations() {
            // First declaration wins for duplicate names (e.g. several impl blocks)
            by_name
                .entry(decl.qualified_name())
                .or_insert_with(|| Arc::clone(decl));
        }

        DocumentContext {
            path: document.path().to_path_buf(),
            fingerprint: document.fingerprint(),
            roots: document.roots().to_vec(),
            uses: document.uses().clone(),
            by_name,
            marker_attributes: marker_attributes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn declarations(&self) -> DeclarationWalk<'_> {
        DeclarationWalk::new(&self.roots)
    }

    /// Find a declaration by qualified name, e.g. `inner::Foo` or `Foo::field`
    pub fn lookup(&self, qualified_name: &str) -> Option<&Arc<Declaration>> {
        self.by_name.get(qualified_name)
    }

    pub fn uses_in(&self, namespace: &[String]) -> &[String] {
        self.uses
            .get(&namespace.join("::"))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether an attribute path is a generation marker in this pipeline
    ///
    /// Generators that copy a declaration use this to avoid re-emitting markers.
    pub fn is_marker_attribute(&self, path: &str) -> bool {
        self.marker_attributes.contains(path)
    }
}
