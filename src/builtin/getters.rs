//! `#[getters]`: reference accessors for a struct's named fields

use crate::diagnostic::Diagnostic;
use crate::generator::{
    GenerationContext, Generator, GeneratorCapabilities, GeneratorFactory, SynthesizedDecl,
};
use crate::marker::MarkerArgs;
use anyhow::anyhow;
use async_trait::async_trait;
use quote::{format_ident, quote};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Getters {
    prefix: String,
}

impl Getters {
    pub fn new(prefix: impl Into<String>) -> anyhow::Result<Self> {
        let prefix = prefix.into();
        super::ident_fragment(&prefix, "Getters prefix")?;
        anyhow::ensure!(
            !prefix.starts_with(|c: char| c.is_ascii_digit()),
            "Getters prefix `{}` must not start with a digit",
            prefix
        );
        Ok(Getters { prefix })
    }

    fn accessors(&self, cx: &GenerationContext) -> anyhow::Result<Option<SynthesizedDecl>> {
        let item: syn::ItemStruct = syn::parse_str(&cx.declaration.source)?;
        let syn::Fields::Named(fields) = &item.fields else {
            cx.diagnostics.report(
                Diagnostic::warning(format!(
                    "#[getters] on `{}` has no named fields to expose",
                    cx.declaration.name
                ))
                .at(cx.declaration.span),
            );
            return Ok(None);
        };
        if fields.named.is_empty() {
            return Ok(None);
        }

        let name = &item.ident;
        let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
        let methods = fields.named.iter().filter_map(|field| {
            let field_name = field.ident.as_ref()?;
            let method = format_ident!("{}{}", self.prefix, field_name);
            let ty = &field.ty;
            Some(quote! {
                pub fn #method(&self) -> &#ty {
                    &self.#field_name
                }
            })
        });
        let tokens = quote! {
            impl #impl_generics #name #ty_generics #where_clause {
                #(#methods)*
            }
        };
        cx.synthesize(tokens.to_string()).map(Some)
    }
}

#[async_trait]
impl Generator for Getters {
    async fn generate(&self, cx: GenerationContext) -> anyhow::Result<Vec<SynthesizedDecl>> {
        cx.checkpoint().await?;
        Ok(self.accessors(&cx)?.into_iter().collect())
    }
}

pub struct GettersFactory;

impl GeneratorFactory for GettersFactory {
    fn capabilities(&self) -> GeneratorCapabilities {
        GeneratorCapabilities {
            reentrant: true,
            ..Default::default()
        }
    }

    fn instantiate(&self, args: &MarkerArgs) -> anyhow::Result<Arc<dyn Generator>> {
        anyhow::ensure!(
            args.positional.is_empty(),
            "Getters takes no positional arguments, use prefix = \"...\""
        );
        if let Some(unknown) = args.named.keys().find(|key| key.as_str() != "prefix") {
            return Err(anyhow!("unknown Getters argument `{}`", unknown));
        }
        let prefix = match args.named("prefix") {
            Some(value) => value
                .as_str()
                .ok_or_else(|| anyhow!("Getters prefix must be a string"))?,
            None => "",
        };
        Ok(Arc::new(Getters::new(prefix)?))
    }
}
