//! Configuration System
//!
//! Hierarchical configuration: built-in defaults, the global config file, the
//! workspace config file, then `MARKGEN__*` environment variables. Validation
//! collects every problem instead of stopping at the first.

use crate::composer::CollisionPolicy;
use crate::document::DeclKind;
use crate::logging::LoggingConfig;
use crate::marker::{GeneratorIdentity, MarkerDefinition};
use crate::orchestrator::RegenerationSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkgenConfig {
    /// Ordered generator search path: `"builtin"` or a directory of libraries
    #[serde(default = "default_search_path")]
    pub search_path: Vec<String>,

    /// Extra marker definitions
    #[serde(default)]
    pub markers: Vec<MarkerConfig>,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub regeneration: RegenerationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_search_path() -> Vec<String> {
    vec![crate::registry::BUILTIN_LOCATION.to_string()]
}

impl Default for MarkgenConfig {
    fn default() -> Self {
        Self {
            search_path: default_search_path(),
            markers: Vec::new(),
            cache: CacheConfig::default(),
            regeneration: RegenerationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[[markers]]` entry binding an attribute to a generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerConfig {
    pub attribute: String,
    /// Exported generator type name
    pub generator: String,
    /// Module exporting the generator
    pub module: String,
    /// Allowed declaration kinds; empty allows any
    #[serde(default)]
    pub targets: Vec<DeclKind>,
}

impl MarkerConfig {
    pub fn to_definition(&self) -> MarkerDefinition {
        MarkerDefinition::new(
            self.attribute.clone(),
            GeneratorIdentity::new(self.generator.clone(), self.module.clone()),
        )
        .with_targets(self.targets.iter().copied())
    }
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Documents kept in the incremental cache
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_capacity() -> usize {
    crate::cache::DEFAULT_CAPACITY
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

/// `[regeneration]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationConfig {
    #[serde(default = "default_max_concurrent_invocations")]
    pub max_concurrent_invocations: usize,

    /// `error` or `first-wins`
    #[serde(default)]
    pub same_declaration_collisions: CollisionPolicy,

    /// Per-document deadline in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_max_concurrent_invocations() -> usize {
    8
}

impl Default for RegenerationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_invocations: default_max_concurrent_invocations(),
            same_declaration_collisions: CollisionPolicy::default(),
            timeout_ms: None,
        }
    }
}

impl RegenerationConfig {
    pub fn settings(&self) -> RegenerationSettings {
        RegenerationSettings {
            max_concurrent_invocations: self.max_concurrent_invocations,
            collision_policy: self.same_declaration_collisions,
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    SearchPath(String),
    Marker(String, String),
    Cache(String),
    Regeneration(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::SearchPath(msg) => write!(f, "search_path: {}", msg),
            ValidationError::Marker(name, msg) => write!(f, "Marker '{}': {}", name, msg),
            ValidationError::Cache(msg) => write!(f, "cache: {}", msg),
            ValidationError::Regeneration(msg) => write!(f, "regeneration: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl MarkgenConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.search_path.is_empty() {
            errors.push(ValidationError::SearchPath(
                "at least one location is required".to_string(),
            ));
        }
        for entry in &self.search_path {
            if entry.trim().is_empty() {
                errors.push(ValidationError::SearchPath("empty entry".to_string()));
            }
        }

        let mut seen: HashMap<&str, (&str, &str)> = HashMap::new();
        for marker in &self.markers {
            if syn::parse_str::<syn::Path>(&marker.attribute).is_err() {
                errors.push(ValidationError::Marker(
                    marker.attribute.clone(),
                    "attribute must be a path such as `dup` or `gen::dup`".to_string(),
                ));
            }
            if marker.generator.trim().is_empty() || marker.module.trim().is_empty() {
                errors.push(ValidationError::Marker(
                    marker.attribute.clone(),
                    "generator and module must not be empty".to_string(),
                ));
            }
            let identity = (marker.generator.as_str(), marker.module.as_str());
            if let Some(existing) = seen.insert(&marker.attribute, identity) {
                if existing != identity {
                    errors.push(ValidationError::Marker(
                        marker.attribute.clone(),
                        format!(
                            "mapped to both {}::{} and {}::{}",
                            existing.1, existing.0, identity.1, identity.0
                        ),
                    ));
                }
            }
        }

        if self.cache.capacity == 0 {
            errors.push(ValidationError::Cache("capacity must be at least 1".to_string()));
        }

        if self.regeneration.max_concurrent_invocations == 0 {
            errors.push(ValidationError::Regeneration(
                "max_concurrent_invocations must be at least 1".to_string(),
            ));
        }
        if self.regeneration.timeout_ms == Some(0) {
            errors.push(ValidationError::Regeneration(
                "timeout_ms must be positive".to_string(),
            ));
        }

        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
