//! Configuration loader facade.

use super::merge;
use super::sources::{global_file, workspace_file};
use super::MarkgenConfig;
use crate::error::SynthError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`MarkgenConfig`] from the layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence, lowest first: defaults, global file, `markgen.toml` in
    /// `workspace_root`, `MARKGEN__*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<MarkgenConfig, SynthError> {
        let builder = merge::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = builder.add_source(merge::environment());

        let config: MarkgenConfig = builder.build()?.try_deserialize()?;
        Self::validated(config)
    }

    /// Load configuration from one explicit file on top of the defaults.
    pub fn load_from_file(path: &Path) -> Result<MarkgenConfig, SynthError> {
        if !path.exists() {
            return Err(SynthError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config: MarkgenConfig = merge::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true))
            .build()?
            .try_deserialize()?;
        Self::validated(config)
    }

    /// Location of the user-level configuration file
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    fn validated(config: MarkgenConfig) -> Result<MarkgenConfig, SynthError> {
        config.validate().map_err(|errors| {
            SynthError::Config(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;
        debug!(
            search_path = ?config.search_path,
            markers = config.markers.len(),
            cache_capacity = config.cache.capacity,
            "Configuration loaded"
        );
        Ok(config)
    }
}
