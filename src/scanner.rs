//! Marker scanner: finds marked declarations in document order

use crate::document::Document;
use crate::error::SynthError;
use crate::marker::{
    GeneratorIdentity, MarkedDeclaration, Marker, MarkerArgs, MarkerCatalog, MarkerSite,
};
use std::sync::Arc;
use tracing::debug;

/// A recognized marker that cannot be invoked
#[derive(Debug)]
pub struct RejectedMarker {
    pub site: MarkerSite,
    pub identity: GeneratorIdentity,
    pub error: SynthError,
}

/// Everything the scanner recognized, both sequences in document order
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub marked: Vec<MarkedDeclaration>,
    pub rejected: Vec<RejectedMarker>,
}

impl ScanOutput {
    /// Total recognized markers, accepted or not
    pub fn len(&self) -> usize {
        self.marked.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Walk every declaration, nested modules and members included, and pair each
/// recognized marker attribute with its declaration.
///
/// Ordinals count recognized markers in document order. A declaration with
/// several markers yields one entry per marker, in attribute order.
pub fn scan(document: &Document, catalog: &MarkerCatalog) -> ScanOutput {
    let mut output = ScanOutput::default();
    let mut ordinal = 0;

    for declaration in document.declarations() {
        for (attribute_index, attribute) in declaration.attributes.iter().enumerate() {
            let Some(definition) = catalog.get(&attribute.path) else {
                continue;
            };

            let site = MarkerSite {
                ordinal,
                attribute: attribute.path.clone(),
                declaration: declaration.qualified_name(),
                attribute_index,
                span: attribute.span,
            };
            ordinal += 1;

            if !definition.allows(declaration.kind) {
                let message = format!(
                    "#[{}] cannot be applied to a {}",
                    attribute.path, declaration.kind
                );
                output.rejected.push(RejectedMarker {
                    identity: definition.identity.clone(),
                    error: SynthError::MalformedMarker {
                        site: site.clone(),
                        message,
                    },
                    site,
                });
                continue;
            }

            match MarkerArgs::evaluate(&attribute.args) {
                Ok(args) => output.marked.push(MarkedDeclaration {
                    declaration: Arc::clone(declaration),
                    marker: Arc::new(Marker {
                        identity: definition.identity.clone(),
                        args,
                        site,
                    }),
                }),
                Err(message) => output.rejected.push(RejectedMarker {
                    identity: definition.identity.clone(),
                    error: SynthError::MalformedMarker {
                        site: site.clone(),
                        message,
                    },
                    site,
                }),
            }
        }
    }

    debug!(
        document = %document.path().display(),
        marked = output.marked.len(),
        rejected = output.rejected.len(),
        "Scanned document"
    );
    output
}
