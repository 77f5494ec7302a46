//! Built-in generator module linked into every host

pub mod dup;
pub mod getters;

use crate::document::DeclKind;
use crate::registry::location::{ModuleConstructor, BUILTIN_MODULES};
use crate::registry::{GeneratorModule, StaticModule};
use linkme::distributed_slice;
use std::sync::Arc;

pub use dup::Dup;
pub use getters::Getters;

pub const MODULE_NAME: &str = "markgen_std";

#[distributed_slice(BUILTIN_MODULES)]
static MARKGEN_STD: ModuleConstructor = std_module;

/// `markgen_std`: `#[dup("Suffix")]` and `#[getters]`
pub fn std_module() -> Arc<dyn GeneratorModule> {
    Arc::new(
        StaticModule::new(MODULE_NAME)
            .with_generator("Dup", dup::DupFactory)
            .with_generator("Getters", getters::GettersFactory)
            .with_marker(
                "dup",
                "Dup",
                [
                    DeclKind::Struct,
                    DeclKind::Enum,
                    DeclKind::Union,
                    DeclKind::Trait,
                    DeclKind::TypeAlias,
                ],
            )
            .with_marker("getters", "Getters", [DeclKind::Struct]),
    )
}

/// Validate a string that will become part of an identifier
pub(crate) fn ident_fragment(value: &str, what: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        value.chars().all(|c| c == '_' || c.is_ascii_alphanumeric()),
        "{} `{}` must contain only ASCII letters, digits and underscores",
        what,
        value
    );
    Ok(())
}
