//! Marker definitions: which attribute maps to which generator

use super::GeneratorIdentity;
use crate::document::DeclKind;
use crate::error::SynthError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Declares `#[attribute]` as a generation marker bound to one generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerDefinition {
    pub attribute: String,
    pub identity: GeneratorIdentity,
    /// Allowed declaration kinds; empty allows any kind
    pub targets: Vec<DeclKind>,
}

impl MarkerDefinition {
    pub fn new(attribute: impl Into<String>, identity: GeneratorIdentity) -> Self {
        MarkerDefinition {
            attribute: attribute.into(),
            identity,
            targets: Vec::new(),
        }
    }

    pub fn with_targets(mut self, targets: impl IntoIterator<Item = DeclKind>) -> Self {
        self.targets = targets.into_iter().collect();
        self
    }

    pub fn allows(&self, kind: DeclKind) -> bool {
        self.targets.is_empty() || self.targets.contains(&kind)
    }
}

/// Attribute path to marker definition.
///
/// An attribute resolves to at most one generator identity; registering a
/// second identity under the same attribute is rejected.
#[derive(Debug, Clone, Default)]
pub struct MarkerCatalog {
    definitions: BTreeMap<String, MarkerDefinition>,
}

impl MarkerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: MarkerDefinition) -> Result<(), SynthError> {
        match self.definitions.get(&definition.attribute) {
            Some(existing) if existing.identity != definition.identity => {
                Err(SynthError::Config(format!(
                    "marker `{}` already maps to {}, cannot remap to {}",
                    definition.attribute, existing.identity, definition.identity
                )))
            }
            Some(_) => {
                // Same identity: a later definition may narrow or widen targets
                self.definitions
                    .insert(definition.attribute.clone(), definition);
                Ok(())
            }
            None => {
                self.definitions
                    .insert(definition.attribute.clone(), definition);
                Ok(())
            }
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&MarkerDefinition> {
        self.definitions.get(attribute)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &MarkerDefinition> {
        self.definitions.values()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
