//! Generator modules: named bundles of exported generator factories

use crate::document::DeclKind;
use crate::generator::GeneratorFactory;
use crate::marker::{GeneratorIdentity, MarkerDefinition};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Something a module exports under a type name
#[derive(Clone)]
pub enum ModuleExport {
    Generator(Arc<dyn GeneratorFactory>),
    /// An export that does not satisfy the generator contract
    Other { kind: String },
}

impl fmt::Debug for ModuleExport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleExport::Generator(factory) => f
                .debug_tuple("Generator")
                .field(&factory.capabilities())
                .finish(),
            ModuleExport::Other { kind } => f.debug_struct("Other").field("kind", kind).finish(),
        }
    }
}

/// A loadable unit of generators
pub trait GeneratorModule: Send + Sync {
    fn name(&self) -> &str;

    /// Exported type names
    fn exports(&self) -> Vec<String>;

    fn export(&self, type_ref: &str) -> Option<ModuleExport>;

    /// Marker attributes this module declares
    fn markers(&self) -> Vec<MarkerDefinition> {
        Vec::new()
    }
}

/// In-memory module assembled with a builder
#[derive(Debug, Clone)]
pub struct StaticModule {
    name: String,
    exports: BTreeMap<String, ModuleExport>,
    markers: Vec<MarkerDefinition>,
}

impl StaticModule {
    pub fn new(name: impl Into<String>) -> Self {
        StaticModule {
            name: name.into(),
            exports: BTreeMap::new(),
            markers: Vec::new(),
        }
    }

    pub fn with_generator<F>(self, type_ref: impl Into<String>, factory: F) -> Self
    where
        F: GeneratorFactory + 'static,
    {
        self.with_export(type_ref, ModuleExport::Generator(Arc::new(factory)))
    }

    pub fn with_export(mut self, type_ref: impl Into<String>, export: ModuleExport) -> Self {
        self.exports.insert(type_ref.into(), export);
        self
    }

    /// Declare `#[attribute]` as a marker for one of this module's exports
    pub fn with_marker(
        mut self,
        attribute: impl Into<String>,
        type_ref: impl Into<String>,
        targets: impl IntoIterator<Item = DeclKind>,
    ) -> Self {
        let identity = GeneratorIdentity::new(type_ref, self.name.clone());
        self.markers
            .push(MarkerDefinition::new(attribute, identity).with_targets(targets));
        self
    }
}

impl GeneratorModule for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn exports(&self) -> Vec<String> {
        self.exports.keys().cloned().collect()
    }

    fn export(&self, type_ref: &str) -> Option<ModuleExport> {
        self.exports.get(type_ref).cloned()
    }

    fn markers(&self) -> Vec<MarkerDefinition> {
        self.markers.clone()
    }
}
