//! Lowers a `syn` syntax tree into the owned declaration model
//!
//! The front end's tree is not thread-safe, so every declaration is copied out
//! as owned text plus metadata before anything crosses a task boundary.

use super::model::{AttributeArgs, AttributeRecord, DeclKind, Declaration};
use crate::types::Span;
use quote::ToTokens;
use std::collections::BTreeMap;
use std::sync::Arc;
use syn::spanned::Spanned;

/// Builds declarations and per-module `use` context from a parsed file
pub(crate) struct DocumentBuilder {
    uses: BTreeMap<String, Vec<String>>,
}

impl DocumentBuilder {
    pub(crate) fn new() -> Self {
        DocumentBuilder {
            uses: BTreeMap::new(),
        }
    }

    pub(crate) fn build(
        mut self,
        file: &syn::File,
    ) -> (Vec<Arc<Declaration>>, BTreeMap<String, Vec<String>>) {
        let roots = self.lower_items(&file.items, &[]);
        (roots, self.uses)
    }

    fn lower_items(&mut self, items: &[syn::Item], namespace: &[String]) -> Vec<Arc<Declaration>> {
        items
            .iter()
            .filter_map(|item| self.lower_item(item, namespace))
            .map(Arc::new)
            .collect()
    }

    fn lower_item(&mut self, item: &syn::Item, namespace: &[String]) -> Option<Declaration> {
        let top = |kind, ident: &syn::Ident, attrs: &[syn::Attribute], children| Declaration {
            kind,
            name: ident.to_string(),
            namespace: namespace.to_vec(),
            owner: None,
            span: ident.span().into(),
            attributes: record_attributes(attrs),
            source: item_source(item),
            children,
        };

        match item {
            syn::Item::Use(item_use) => {
                let mut bare = item_use.clone();
                bare.attrs.clear();
                self.uses
                    .entry(namespace.join("::"))
                    .or_default()
                    .push(bare.to_token_stream().to_string());
                None
            }
            syn::Item::Struct(s) => {
                let fields = lower_fields(&s.fields, &s.ident.to_string(), namespace);
                Some(top(DeclKind::Struct, &s.ident, &s.attrs, fields))
            }
            syn::Item::Union(u) => {
                let fields = lower_fields(
                    &syn::Fields::Named(u.fields.clone()),
                    &u.ident.to_string(),
                    namespace,
                );
                Some(top(DeclKind::Union, &u.ident, &u.attrs, fields))
            }
            syn::Item::Enum(e) => {
                let owner = e.ident.to_string();
                let variants = e
                    .variants
                    .iter()
                    .map(|variant| {
                        let mut bare = variant.clone();
                        bare.attrs.clear();
                        Arc::new(member(
                            DeclKind::Variant,
                            variant.ident.to_string(),
                            &owner,
                            namespace,
                            variant.ident.span().into(),
                            &variant.attrs,
                            bare.to_token_stream().to_string(),
                        ))
                    })
                    .collect();
                Some(top(DeclKind::Enum, &e.ident, &e.attrs, variants))
            }
            syn::Item::Trait(t) => {
                let owner = t.ident.to_string();
                let items = t
                    .items
                    .iter()
                    .filter_map(|trait_item| lower_trait_item(trait_item, &owner, namespace))
                    .map(Arc::new)
                    .collect();
                Some(top(DeclKind::Trait, &t.ident, &t.attrs, items))
            }
            syn::Item::Impl(imp) => {
                let owner = type_name(&imp.self_ty);
                let name = match &imp.trait_ {
                    Some((_, path, _)) => format!("impl {} for {}", path_to_string(path), owner),
                    None => format!("impl {}", owner),
                };
                let items = imp
                    .items
                    .iter()
                    .filter_map(|impl_item| lower_impl_item(impl_item, &owner, namespace))
                    .map(Arc::new)
                    .collect();
                Some(Declaration {
                    kind: DeclKind::Impl,
                    name,
                    namespace: namespace.to_vec(),
                    owner: None,
                    span: imp.impl_token.span.into(),
                    attributes: record_attributes(&imp.attrs),
                    source: item_source(item),
                    children: items,
                })
            }
            syn::Item::Mod(m) => {
                let children = match &m.content {
                    Some((_, items)) => {
                        let mut inner = namespace.to_vec();
                        inner.push(m.ident.to_string());
                        self.lower_items(items, &inner)
                    }
                    None => Vec::new(),
                };
                Some(top(DeclKind::Module, &m.ident, &m.attrs, children))
            }
            syn::Item::Fn(f) => Some(top(DeclKind::Fn, &f.sig.ident, &f.attrs, Vec::new())),
            syn::Item::Const(c) => Some(top(DeclKind::Const, &c.ident, &c.attrs, Vec::new())),
            syn::Item::Static(s) => Some(top(DeclKind::Static, &s.ident, &s.attrs, Vec::new())),
            syn::Item::Type(t) => Some(top(DeclKind::TypeAlias, &t.ident, &t.attrs, Vec::new())),
            _ => None,
        }
    }
}

fn member(
    kind: DeclKind,
    name: String,
    owner: &str,
    namespace: &[String],
    span: Span,
    attrs: &[syn::Attribute],
    source: String,
) -> Declaration {
    Declaration {
        kind,
        name,
        namespace: namespace.to_vec(),
        owner: Some(owner.to_string()),
        span,
        attributes: record_attributes(attrs),
        source,
        children: Vec::new(),
    }
}

fn lower_fields(fields: &syn::Fields, owner: &str, namespace: &[String]) -> Vec<Arc<Declaration>> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let (name, span) = match &field.ident {
                Some(ident) => (ident.to_string(), ident.span().into()),
                None => (index.to_string(), field.ty.span().into()),
            };
            let mut bare = field.clone();
            bare.attrs.clear();
            Arc::new(member(
                DeclKind::Field,
                name,
                owner,
                namespace,
                span,
                &field.attrs,
                bare.to_token_stream().to_string(),
            ))
        })
        .collect()
}

fn lower_impl_item(item: &syn::ImplItem, owner: &str, namespace: &[String]) -> Option<Declaration> {
    let mut bare = item.clone();
    let (kind, ident, attrs) = match item {
        syn::ImplItem::Fn(f) => (DeclKind::Method, &f.sig.ident, &f.attrs),
        syn::ImplItem::Const(c) => (DeclKind::AssocConst, &c.ident, &c.attrs),
        syn::ImplItem::Type(t) => (DeclKind::AssocType, &t.ident, &t.attrs),
        _ => return None,
    };
    match &mut bare {
        syn::ImplItem::Fn(f) => f.attrs.clear(),
        syn::ImplItem::Const(c) => c.attrs.clear(),
        syn::ImplItem::Type(t) => t.attrs.clear(),
        _ => {}
    }
    Some(member(
        kind,
        ident.to_string(),
        owner,
        namespace,
        ident.span().into(),
        attrs,
        bare.to_token_stream().to_string(),
    ))
}

fn lower_trait_item(item: &syn::TraitItem, owner: &str, namespace: &[String]) -> Option<Declaration> {
    let mut bare = item.clone();
    let (kind, ident, attrs) = match item {
        syn::TraitItem::Fn(f) => (DeclKind::Method, &f.sig.ident, &f.attrs),
        syn::TraitItem::Const(c) => (DeclKind::AssocConst, &c.ident, &c.attrs),
        syn::TraitItem::Type(t) => (DeclKind::AssocType, &t.ident, &t.attrs),
        _ => return None,
    };
    match &mut bare {
        syn::TraitItem::Fn(f) => f.attrs.clear(),
        syn::TraitItem::Const(c) => c.attrs.clear(),
        syn::TraitItem::Type(t) => t.attrs.clear(),
        _ => {}
    }
    Some(member(
        kind,
        ident.to_string(),
        owner,
        namespace,
        ident.span().into(),
        attrs,
        bare.to_token_stream().to_string(),
    ))
}

fn record_attributes(attrs: &[syn::Attribute]) -> Vec<AttributeRecord> {
    attrs
        .iter()
        .filter(|attr| matches!(attr.style, syn::AttrStyle::Outer))
        .map(|attr| AttributeRecord {
            path: path_to_string(attr.path()),
            args: match &attr.meta {
                syn::Meta::Path(_) => AttributeArgs::None,
                syn::Meta::List(list) => AttributeArgs::List(list.tokens.to_string()),
                syn::Meta::NameValue(nv) => {
                    AttributeArgs::Value(nv.value.to_token_stream().to_string())
                }
            },
            text: attr.to_token_stream().to_string(),
            span: attr.span().into(),
        })
        .collect()
}

/// Item tokens with the item's own outer attributes removed
fn item_source(item: &syn::Item) -> String {
    let mut bare = item.clone();
    if let Some(attrs) = item_attrs_mut(&mut bare) {
        attrs.retain(|attr| matches!(attr.style, syn::AttrStyle::Inner(_)));
    }
    bare.to_token_stream().to_string()
}

pub(crate) fn item_attrs_mut(item: &mut syn::Item) -> Option<&mut Vec<syn::Attribute>> {
    match item {
        syn::Item::Const(i) => Some(&mut i.attrs),
        syn::Item::Enum(i) => Some(&mut i.attrs),
        syn::Item::ExternCrate(i) => Some(&mut i.attrs),
        syn::Item::Fn(i) => Some(&mut i.attrs),
        syn::Item::ForeignMod(i) => Some(&mut i.attrs),
        syn::Item::Impl(i) => Some(&mut i.attrs),
        syn::Item::Macro(i) => Some(&mut i.attrs),
        syn::Item::Mod(i) => Some(&mut i.attrs),
        syn::Item::Static(i) => Some(&mut i.attrs),
        syn::Item::Struct(i) => Some(&mut i.attrs),
        syn::Item::Trait(i) => Some(&mut i.attrs),
        syn::Item::TraitAlias(i) => Some(&mut i.attrs),
        syn::Item::Type(i) => Some(&mut i.attrs),
        syn::Item::Union(i) => Some(&mut i.attrs),
        syn::Item::Use(i) => Some(&mut i.attrs),
        _ => None,
    }
}

/// Kind, name and member names of a single item, used for synthesized output
pub(crate) fn describe_item(item: &syn::Item) -> Option<(DeclKind, Option<String>, Vec<String>)> {
    let described = match item {
        syn::Item::Struct(s) => (DeclKind::Struct, Some(s.ident.to_string()), Vec::new()),
        syn::Item::Enum(e) => (DeclKind::Enum, Some(e.ident.to_string()), Vec::new()),
        syn::Item::Union(u) => (DeclKind::Union, Some(u.ident.to_string()), Vec::new()),
        syn::Item::Trait(t) => (DeclKind::Trait, Some(t.ident.to_string()), Vec::new()),
        syn::Item::Fn(f) => (DeclKind::Fn, Some(f.sig.ident.to_string()), Vec::new()),
        syn::Item::Const(c) => (DeclKind::Const, Some(c.ident.to_string()), Vec::new()),
        syn::Item::Static(s) => (DeclKind::Static, Some(s.ident.to_string()), Vec::new()),
        syn::Item::Type(t) => (DeclKind::TypeAlias, Some(t.ident.to_string()), Vec::new()),
        syn::Item::Mod(m) => (DeclKind::Module, Some(m.ident.to_string()), Vec::new()),
        syn::Item::Impl(imp) => {
            // Generic arguments are part of the key: `impl From<A> for Foo` and
            // `impl From<B> for Foo` do not clash
            let owner = imp.self_ty.to_token_stream().to_string();
            let members = imp
                .items
                .iter()
                .filter_map(|impl_item| match impl_item {
                    syn::ImplItem::Fn(f) => Some(f.sig.ident.to_string()),
                    syn::ImplItem::Const(c) => Some(c.ident.to_string()),
                    syn::ImplItem::Type(t) => Some(t.ident.to_string()),
                    _ => None,
                })
                .map(|name| match &imp.trait_ {
                    // Trait impls resolve members through the trait
                    Some((_, path, _)) => {
                        format!("<{} as {}>::{}", owner, path.to_token_stream(), name)
                    }
                    None => format!("{}::{}", owner, name),
                })
                .collect();
            (DeclKind::Impl, None, members)
        }
        _ => return None,
    };
    Some(described)
}

pub(crate) fn path_to_string(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

/// Last path segment for plain paths (`Foo` for `crate::Foo<T>`), tokens otherwise
pub(crate) fn type_name(ty: &syn::Type) -> String {
    match ty {
        syn::Type::Path(p) if p.qself.is_none() => p
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .unwrap_or_else(|| ty.to_token_stream().to_string()),
        _ => ty.to_token_stream().to_string(),
    }
}
