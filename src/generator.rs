//! Generator capability contract
//!
//! A generator module exports factories. The registry resolves a factory by
//! identity, the orchestrator instantiates it with the marker's constant
//! arguments, and the invoker runs the resulting generator's async entry point.

use crate::diagnostic::DiagnosticSink;
use crate::document::builder::describe_item;
use crate::document::{DeclKind, Declaration, DocumentContext};
use crate::error::SynthError;
use crate::marker::{Marker, MarkerArgs};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Capability contract version generators are built against
pub const CONTRACT_VERSION: u32 = 1;

/// What a generator factory declares about itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GeneratorCapabilities {
    pub contract_version: u32,
    /// Instances hold no per-invocation state and may be shared across
    /// invocations with identical arguments
    pub reentrant: bool,
}

impl Default for GeneratorCapabilities {
    fn default() -> Self {
        GeneratorCapabilities {
            contract_version: CONTRACT_VERSION,
            reentrant: false,
        }
    }
}

/// Async generation entry point
#[async_trait]
pub trait Generator: Send + Sync {
    /// Synthesize declarations for one marked declaration.
    ///
    /// Returning an empty vector is valid. Implementations should observe
    /// `cx.cancel` at their own suspension points.
    async fn generate(&self, cx: GenerationContext) -> anyhow::Result<Vec<SynthesizedDecl>>;
}

/// Constructor side of the contract
pub trait GeneratorFactory: Send + Sync {
    fn capabilities(&self) -> GeneratorCapabilities {
        GeneratorCapabilities::default()
    }

    /// Build an instance from evaluated marker arguments; an error means the
    /// arguments were rejected
    fn instantiate(&self, args: &MarkerArgs) -> anyhow::Result<Arc<dyn Generator>>;
}

impl<F> GeneratorFactory for F
where
    F: Fn(&MarkerArgs) -> anyhow::Result<Arc<dyn Generator>> + Send + Sync,
{
    fn instantiate(&self, args: &MarkerArgs) -> anyhow::Result<Arc<dyn Generator>> {
        self(args)
    }
}

/// Everything a generator receives for one invocation
#[derive(Clone)]
pub struct GenerationContext {
    pub declaration: Arc<Declaration>,
    pub marker: Arc<Marker>,
    pub document: Arc<DocumentContext>,
    pub diagnostics: DiagnosticSink,
    pub cancel: CancellationToken,
}

impl GenerationContext {
    pub fn args(&self) -> &MarkerArgs {
        &self.marker.args
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Yield to the runtime and fail if the regeneration was cancelled
    pub async fn checkpoint(&self) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        if self.cancel.is_cancelled() {
            return Err(SynthError::RegenerationCancelled.into());
        }
        Ok(())
    }

    /// Parse one item into a declaration placed beside the marked declaration
    pub fn synthesize(&self, source: impl Into<String>) -> anyhow::Result<SynthesizedDecl> {
        SynthesizedDecl::parse(self.declaration.namespace.clone(), source)
    }
}

/// One generated item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesizedDecl {
    pub kind: DeclKind,
    /// Item name; `None` for impl blocks
    pub name: Option<String>,
    /// Module path the item belongs in
    pub namespace: Vec<String>,
    pub source: String,
    /// Member paths of an impl block, `SelfTy::member`
    pub members: Vec<String>,
    /// Extra `use` items the declaration needs, e.g. `use std::fmt;`
    pub imports: Vec<String>,
}

impl SynthesizedDecl {
    /// Parse exactly one Rust item
    pub fn parse(namespace: Vec<String>, source: impl Into<String>) -> anyhow::Result<Self> {
        let source = source.into();
        let item: syn::Item = syn::parse_str(&source)
            .map_err(|e| anyhow::anyhow!("synthesized source is not a single item: {}", e))?;
        let (kind, name, members) = describe_item(&item)
            .ok_or_else(|| anyhow::anyhow!("unsupported synthesized item"))?;
        Ok(SynthesizedDecl {
            kind,
            name,
            namespace,
            source,
            members,
            imports: Vec::new(),
        })
    }

    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }

    /// Names this declaration occupies in its namespace
    pub fn collision_keys(&self) -> Vec<String> {
        let prefix = |name: &str| {
            if self.namespace.is_empty() {
                name.to_string()
            } else {
                format!("{}::{}", self.namespace.join("::"), name)
            }
        };
        match &self.name {
            Some(name) => vec![prefix(name)],
            None => self.members.iter().map(|member| prefix(member)).collect(),
        }
    }

    /// Re-check structural well-formedness: the source must still parse as one
    /// item that matches the recorded kind, name and members
    pub(crate) fn validate(&self) -> Result<(), String> {
        let item: syn::Item = syn::parse_str(&self.source)
            .map_err(|e| format!("synthesized source is not a single item: {}", e))?;
        let (kind, name, members) =
            describe_item(&item).ok_or_else(|| "unsupported synthesized item".to_string())?;
        if kind != self.kind || name != self.name {
            return Err(format!(
                "synthesized item is a {} named {:?}, declared as a {} named {:?}",
                kind, name, self.kind, self.name
            ));
        }
        if members != self.members {
            return Err(format!(
                "synthesized item defines members {:?}, declared as {:?}",
                members, self.members
            ));
        }
        for import in &self.imports {
            syn::parse_str::<syn::ItemUse>(import)
                .map_err(|e| format!("invalid import `{}`: {}", import, e))?;
        }
        Ok(())
    }
}
