//! Dynamic library location (`dylib` feature)
//!
//! A directory on the search path holding one shared library per module,
//! named with the platform convention (`libfoo.so`, `foo.dll`, `libfoo.dylib`).
//! Libraries export the symbols produced by [`crate::export_module!`] and must be
//! built with the same compiler as the host.

use super::location::ModuleLocation;
use super::module::{GeneratorModule, ModuleExport};
use crate::generator::CONTRACT_VERSION;
use crate::marker::MarkerDefinition;
use libloading::{Library, Symbol};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub const ENTRY_SYMBOL: &[u8] = b"markgen_module_entry\0";
pub const VERSION_SYMBOL: &[u8] = b"markgen_contract_version\0";

type EntryFn = fn() -> Box<dyn GeneratorModule>;
type VersionFn = fn() -> u32;

/// A module whose code lives in a loaded library.
///
/// Field order matters: the module is dropped before its library is unloaded.
struct LibraryModule {
    inner: Box<dyn GeneratorModule>,
    _library: Arc<Library>,
}

impl GeneratorModule for LibraryModule {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn exports(&self) -> Vec<String> {
        self.inner.exports()
    }

    fn export(&self, type_ref: &str) -> Option<ModuleExport> {
        self.inner.export(type_ref)
    }

    fn markers(&self) -> Vec<MarkerDefinition> {
        self.inner.markers()
    }
}

pub struct DylibLocation {
    dir: PathBuf,
    libraries: Mutex<HashMap<String, Arc<Library>>>,
}

impl DylibLocation {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DylibLocation {
            dir: dir.into(),
            libraries: Mutex::new(HashMap::new()),
        }
    }

    fn library_path(&self, module: &str) -> PathBuf {
        self.dir.join(libloading::library_filename(module))
    }

    fn open(&self, module: &str, path: &Path) -> Result<Arc<Library>, String> {
        let mut libraries = self.libraries.lock();
        if let Some(library) = libraries.get(module) {
            return Ok(Arc::clone(library));
        }

        info!(module = %module, path = %path.display(), "Loading generator library");
        // Loading runs the library's initializers; the search path is trusted input.
        let library = unsafe { Library::new(path) }
            .map_err(|e| format!("Failed to load library {}: {}", path.display(), e))?;
        let library = Arc::new(library);
        libraries.insert(module.to_string(), Arc::clone(&library));
        Ok(library)
    }
}

impl ModuleLocation for DylibLocation {
    fn describe(&self) -> String {
        self.dir.display().to_string()
    }

    fn available(&self) -> Vec<String> {
        let prefix = std::env::consts::DLL_PREFIX;
        let suffix = std::env::consts::DLL_SUFFIX;
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut modules: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| {
                name.strip_prefix(prefix)
                    .and_then(|rest| rest.strip_suffix(suffix))
                    .map(str::to_string)
            })
            .collect();
        modules.sort();
        modules
    }

    fn load(&self, module: &str) -> Result<Option<Arc<dyn GeneratorModule>>, String> {
        let path = self.library_path(module);
        if !path.is_file() {
            debug!(module = %module, dir = %self.dir.display(), "No library for module");
            return Ok(None);
        }

        let library = self.open(module, &path)?;

        let version = unsafe {
            let symbol: Symbol<VersionFn> = library
                .get(VERSION_SYMBOL)
                .map_err(|_| "Missing symbol 'markgen_contract_version'".to_string())?;
            symbol()
        };
        if version != CONTRACT_VERSION {
            return Err(format!(
                "Incompatible contract version: host={}, module={}",
                CONTRACT_VERSION, version
            ));
        }

        let inner = unsafe {
            let symbol: Symbol<EntryFn> = library
                .get(ENTRY_SYMBOL)
                .map_err(|_| "Missing symbol 'markgen_module_entry'".to_string())?;
            symbol()
        };

        Ok(Some(Arc::new(LibraryModule {
            inner,
            _library: library,
        })))
    }
}
