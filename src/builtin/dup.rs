//! `#[dup("Suffix")]`: copy a type declaration under a suffixed name

use crate::generator::{
    GenerationContext, Generator, GeneratorCapabilities, GeneratorFactory, SynthesizedDecl,
};
use crate::marker::MarkerArgs;
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use quote::{format_ident, ToTokens};
use std::sync::Arc;

/// Emits a copy of the marked declaration named `<Name><suffix>`.
///
/// The copy keeps every attribute except generation markers, so `#[derive]`s
/// and docs carry over.
#[derive(Debug, Clone)]
pub struct Dup {
    suffix: String,
}

impl Dup {
    pub fn new(suffix: impl Into<String>) -> anyhow::Result<Self> {
        let suffix = suffix.into();
        anyhow::ensure!(!suffix.is_empty(), "Dup suffix must not be empty");
        super::ident_fragment(&suffix, "Dup suffix")?;
        Ok(Dup { suffix })
    }

    fn duplicate(&self, cx: &GenerationContext) -> anyhow::Result<SynthesizedDecl> {
        let declaration = &cx.declaration;
        let mut item: syn::Item = syn::parse_str(&declaration.source)?;
        let ident = match &mut item {
            syn::Item::Struct(i) => &mut i.ident,
            syn::Item::Enum(i) => &mut i.ident,
            syn::Item::Union(i) => &mut i.ident,
            syn::Item::Trait(i) => &mut i.ident,
            syn::Item::Type(i) => &mut i.ident,
            _ => bail!("cannot duplicate a {}", declaration.kind),
        };
        let renamed = format_ident!("{}{}", ident, self.suffix);
        *ident = renamed;

        let mut source = String::new();
        for attribute in declaration.attributes_except(|path| cx.document.is_marker_attribute(path)) {
            source.push_str(attribute);
            source.push('\n');
        }
        source.push_str(&item.to_token_stream().to_string());
        cx.synthesize(source)
    }
}

#[async_trait]
impl Generator for Dup {
    async fn generate(&self, cx: GenerationContext) -> anyhow::Result<Vec<SynthesizedDecl>> {
        cx.checkpoint().await?;
        Ok(vec![self.duplicate(&cx)?])
    }
}

pub struct DupFactory;

impl GeneratorFactory for DupFactory {
    fn capabilities(&self) -> GeneratorCapabilities {
        GeneratorCapabilities {
            reentrant: true,
            ..Default::default()
        }
    }

    fn instantiate(&self, args: &MarkerArgs) -> anyhow::Result<Arc<dyn Generator>> {
        let suffix = args
            .get(0, "suffix")
            .ok_or_else(|| anyhow!("Dup expects a suffix, e.g. #[dup(\"Copy\")]"))?;
        let suffix = suffix
            .as_str()
            .ok_or_else(|| anyhow!("Dup suffix must be a string, got {}", suffix.type_name()))?;
        Ok(Arc::new(Dup::new(suffix)?))
    }
}
