//! Error types for the markgen generation pipeline.

use crate::marker::{GeneratorIdentity, MarkerSite};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while regenerating a document.
///
/// The first four variants are scoped to a single marker and end up as
/// diagnostics on the synthesized unit. The rest abort the whole regeneration.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Malformed marker {site}: {message}")]
    MalformedMarker { site: MarkerSite, message: String },

    #[error("Generator not found: {identity} (searched: {})", .searched.join(", "))]
    GeneratorNotFound {
        identity: GeneratorIdentity,
        searched: Vec<String>,
    },

    #[error("Failed to load generator {identity}: {reason}")]
    GeneratorLoad {
        identity: GeneratorIdentity,
        reason: String,
    },

    #[error("Generator {identity} failed for {site}: {message}")]
    GeneratorExecution {
        identity: GeneratorIdentity,
        site: MarkerSite,
        message: String,
    },

    #[error("Synthesized name collision on `{name}` between {first} and {second}")]
    SynthesizedNameCollision {
        name: String,
        first: MarkerSite,
        second: MarkerSite,
    },

    #[error("Regeneration cancelled")]
    RegenerationCancelled,

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthError {
    /// Stable machine-readable code, carried on diagnostics
    pub fn code(&self) -> &'static str {
        match self {
            SynthError::MalformedMarker { .. } => "malformed-marker",
            SynthError::GeneratorNotFound { .. } => "generator-not-found",
            SynthError::GeneratorLoad { .. } => "generator-load",
            SynthError::GeneratorExecution { .. } => "generator-execution",
            SynthError::SynthesizedNameCollision { .. } => "name-collision",
            SynthError::RegenerationCancelled => "cancelled",
            SynthError::Parse { .. } => "parse",
            SynthError::Config(_) => "config",
            SynthError::Io(_) => "io",
        }
    }

    /// Whether this error discards the whole regeneration rather than one marker's output
    pub fn is_document_fatal(&self) -> bool {
        !matches!(
            self,
            SynthError::MalformedMarker { .. }
                | SynthError::GeneratorNotFound { .. }
                | SynthError::GeneratorLoad { .. }
                | SynthError::GeneratorExecution { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SynthError::RegenerationCancelled)
    }
}

impl From<config::ConfigError> for SynthError {
    fn from(err: config::ConfigError) -> Self {
        SynthError::Config(err.to_string())
    }
}
