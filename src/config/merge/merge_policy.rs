//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("search_path", vec![crate::registry::BUILTIN_LOCATION])?
        .set_default("cache.capacity", crate::cache::DEFAULT_CAPACITY as i64)?
        .set_default("regeneration.max_concurrent_invocations", 8_i64)?
        .set_default("regeneration.same_declaration_collisions", "error")
}

/// `MARKGEN__SECTION__KEY` overrides; applied last.
pub fn environment() -> Environment {
    Environment::with_prefix("MARKGEN")
        .separator("__")
        .try_parsing(true)
}
