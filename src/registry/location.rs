//! Search path locations modules are loaded from

use super::module::GeneratorModule;
use crate::error::SynthError;
use linkme::distributed_slice;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Constructor for a module linked into the host binary
pub type ModuleConstructor = fn() -> Arc<dyn GeneratorModule>;

/// Modules linked into the host, collected across crates at link time
#[distributed_slice]
pub static BUILTIN_MODULES: [ModuleConstructor] = [..];

/// Search path entry name for the in-process location
pub const BUILTIN_LOCATION: &str = "builtin";

/// One entry of the generator search path
pub trait ModuleLocation: Send + Sync {
    /// Human-readable label used in diagnostics
    fn describe(&self) -> String;

    /// Names of the modules this location can load
    fn available(&self) -> Vec<String>;

    /// Load a module by locator. `Ok(None)` means this location does not have it.
    fn load(&self, module: &str) -> Result<Option<Arc<dyn GeneratorModule>>, String>;
}

/// Modules that live in the host process
#[derive(Clone)]
pub struct StaticLocation {
    label: String,
    modules: BTreeMap<String, Arc<dyn GeneratorModule>>,
}

impl StaticLocation {
    pub fn new(label: impl Into<String>) -> Self {
        StaticLocation {
            label: label.into(),
            modules: BTreeMap::new(),
        }
    }

    /// Location holding every module registered in [`BUILTIN_MODULES`]
    pub fn builtin() -> Self {
        BUILTIN_MODULES
            .iter()
            .fold(Self::new(BUILTIN_LOCATION), |location, constructor| {
                location.with_module(constructor())
            })
    }

    pub fn with_module(mut self, module: Arc<dyn GeneratorModule>) -> Self {
        self.modules.insert(module.name().to_string(), module);
        self
    }
}

impl fmt::Debug for StaticLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticLocation")
            .field("label", &self.label)
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ModuleLocation for StaticLocation {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn available(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    fn load(&self, module: &str) -> Result<Option<Arc<dyn GeneratorModule>>, String> {
        Ok(self.modules.get(module).cloned())
    }
}

/// Ordered list of locations; the first location exporting a type wins
#[derive(Clone, Default)]
pub struct SearchPath {
    locations: Vec<Arc<dyn ModuleLocation>>,
}

impl SearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, location: impl ModuleLocation + 'static) -> Self {
        self.push(Arc::new(location));
        self
    }

    pub fn push(&mut self, location: Arc<dyn ModuleLocation>) {
        self.locations.push(location);
    }

    pub fn locations(&self) -> &[Arc<dyn ModuleLocation>] {
        &self.locations
    }

    pub fn describe(&self) -> Vec<String> {
        self.locations.iter().map(|l| l.describe()).collect()
    }

    /// Build from configured entries: `"builtin"` or a directory of dynamic libraries
    pub fn from_config(entries: &[String]) -> Result<Self, SynthError> {
        let mut path = SearchPath::new();
        for entry in entries {
            if entry == BUILTIN_LOCATION {
                path.push(Arc::new(StaticLocation::builtin()));
                continue;
            }
            path.push(directory_location(entry)?);
        }
        Ok(path)
    }
}

impl fmt::Debug for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.describe()).finish()
    }
}

#[cfg(feature = "dylib")]
fn directory_location(entry: &str) -> Result<Arc<dyn ModuleLocation>, SynthError> {
    Ok(Arc::new(super::dylib::DylibLocation::new(entry)))
}

#[cfg(not(feature = "dylib"))]
fn directory_location(entry: &str) -> Result<Arc<dyn ModuleLocation>, SynthError> {
    Err(SynthError::Config(format!(
        "search path entry `{}` needs the `dylib` feature",
        entry
    )))
}
