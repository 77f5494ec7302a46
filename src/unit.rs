//! Synthesized compilation unit for one document

use crate::diagnostic::Diagnostic;
use crate::generator::SynthesizedDecl;
use crate::marker::{GeneratorIdentity, MarkerSite};
use crate::render;
use crate::types::Fingerprint;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A synthesized declaration tagged with the marker that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitDeclaration {
    pub origin: MarkerSite,
    pub identity: GeneratorIdentity,
    pub declaration: SynthesizedDecl,
}

/// Everything generated for one document fingerprint.
///
/// Immutable once composed. A newer regeneration replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesizedUnit {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
    /// Marker document order, then generator emission order
    pub declarations: Vec<UnitDeclaration>,
    /// Sorted, de-duplicated `use` items per namespace (`""` for the root)
    pub imports: BTreeMap<String, Vec<String>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SynthesizedUnit {
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_error())
    }

    /// Declaration names in order, for display and assertions
    pub fn declaration_names(&self) -> Vec<String> {
        self.declarations
            .iter()
            .flat_map(|d| d.declaration.collision_keys())
            .collect()
    }

    /// Render as a Rust source file
    pub fn render(&self) -> String {
        render::render_unit(self)
    }
}
