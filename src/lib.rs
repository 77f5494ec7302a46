//! markgen: Attribute-Driven Code Generation
//!
//! Scans Rust sources for marker attributes, resolves the generator each
//! marker names from an ordered search path of modules, invokes generators
//! concurrently under cancellation, and composes their output into one
//! synthesized unit per document. Units are cached by document fingerprint.

pub mod builtin;
pub mod cache;
pub mod cli;
pub mod composer;
pub mod config;
pub mod diagnostic;
pub mod document;
pub mod error;
pub mod generator;
pub mod invoker;
pub mod logging;
pub mod marker;
pub mod orchestrator;
pub mod registry;
pub mod render;
pub mod scanner;
pub mod types;
pub mod unit;

pub use cache::IncrementalCache;
pub use composer::CollisionPolicy;
pub use config::{ConfigLoader, MarkgenConfig};
pub use diagnostic::{Diagnostic, DiagnosticSink, Severity};
pub use document::Document;
pub use error::SynthError;
pub use generator::{
    GenerationContext, Generator, GeneratorCapabilities, GeneratorFactory, SynthesizedDecl,
};
pub use marker::{GeneratorIdentity, MarkerArgs, MarkerCatalog, MarkerDefinition};
pub use orchestrator::{Orchestrator, RegenerationSettings};
pub use registry::{GeneratorRegistry, SearchPath, StaticLocation, StaticModule};
pub use types::{Fingerprint, Span};
pub use unit::SynthesizedUnit;
