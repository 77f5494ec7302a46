//! Generator registry: identity to loaded generator, with module caching
//!
//! Modules are loaded at most once per (location, locator) and generators at
//! most once per identity. Concurrent resolves of the same identity wait on a
//! single load rather than racing.

pub mod location;
pub mod module;

#[cfg(feature = "dylib")]
pub mod dylib;

pub use location::{ModuleLocation, SearchPath, StaticLocation, BUILTIN_LOCATION, BUILTIN_MODULES};
pub use module::{GeneratorModule, ModuleExport, StaticModule};

use crate::error::SynthError;
use crate::generator::{
    Generator, GeneratorCapabilities, GeneratorFactory, CONTRACT_VERSION,
};
use crate::marker::{GeneratorIdentity, Marker, MarkerArgs, MarkerDefinition};
use lru::LruCache;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A generator instance ready to be invoked
pub type GeneratorInstance = Arc<dyn Generator>;

/// A resolved generator factory bound to its identity
pub struct LoadedGenerator {
    pub identity: GeneratorIdentity,
    /// Search path entry the generator was found in
    pub location: String,
    pub capabilities: GeneratorCapabilities,
    factory: Arc<dyn GeneratorFactory>,
    // Declared after `factory`: a library-backed module outlives the code it provides
    module: Arc<dyn GeneratorModule>,
}

impl fmt::Debug for LoadedGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedGenerator")
            .field("identity", &self.identity)
            .field("location", &self.location)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// One module visible on the search path
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    pub location: String,
    pub module: String,
    pub exports: Vec<String>,
}

type ModuleSlot = Arc<OnceCell<Option<Arc<dyn GeneratorModule>>>>;
type GeneratorSlot = Arc<OnceCell<Arc<LoadedGenerator>>>;
type InstanceKey = (GeneratorIdentity, MarkerArgs);

/// Reentrant instances kept for reuse, least recently used evicted first
pub const DEFAULT_INSTANCE_CAPACITY: usize = 256;

/// A shared instance and the module whose code backs it
struct CachedInstance {
    instance: GeneratorInstance,
    _module: Arc<dyn GeneratorModule>,
}

pub struct GeneratorRegistry {
    search_path: SearchPath,
    modules: Mutex<HashMap<(usize, String), ModuleSlot>>,
    generators: Mutex<HashMap<GeneratorIdentity, GeneratorSlot>>,
    instances: Mutex<LruCache<InstanceKey, CachedInstance>>,
    module_loads: AtomicUsize,
    generator_loads: AtomicUsize,
}

impl GeneratorRegistry {
    pub fn new(search_path: SearchPath) -> Self {
        GeneratorRegistry {
            search_path,
            modules: Mutex::new(HashMap::new()),
            generators: Mutex::new(HashMap::new()),
            instances: Mutex::new(LruCache::new(instance_capacity(DEFAULT_INSTANCE_CAPACITY))),
            module_loads: AtomicUsize::new(0),
            generator_loads: AtomicUsize::new(0),
        }
    }

    /// Bound the number of reentrant instances kept for reuse
    pub fn with_instance_capacity(self, capacity: usize) -> Self {
        self.instances.lock().resize(instance_capacity(capacity));
        self
    }

    /// Reentrant instances currently kept for reuse
    pub fn cached_instances(&self) -> usize {
        self.instances.lock().len()
    }

    /// Drop every kept instance; later markers construct fresh ones
    pub fn clear_instances(&self) {
        self.instances.lock().clear();
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Resolve an identity to its generator, loading the module if needed
    pub fn resolve(&self, identity: &GeneratorIdentity) -> Result<Arc<LoadedGenerator>, SynthError> {
        let slot = {
            let mut generators = self.generators.lock();
            Arc::clone(generators.entry(identity.clone()).or_default())
        };
        // Lock released: only resolvers of this identity wait on the slot
        slot.get_or_try_init(|| self.load_generator(identity))
            .map(Arc::clone)
    }

    /// Construct an instance for one marker.
    ///
    /// Reentrant generators are reused for identical (identity, args) pairs.
    pub fn instantiate(
        &self,
        loaded: &LoadedGenerator,
        marker: &Marker,
    ) -> Result<GeneratorInstance, SynthError> {
        let key = (loaded.identity.clone(), marker.args.clone());
        if loaded.capabilities.reentrant {
            if let Some(cached) = self.instances.lock().get(&key) {
                return Ok(Arc::clone(&cached.instance));
            }
        }

        let factory = Arc::clone(&loaded.factory);
        let constructed =
            std::panic::catch_unwind(AssertUnwindSafe(|| factory.instantiate(&marker.args)));
        let instance = match constructed {
            Ok(Ok(instance)) => instance,
            Ok(Err(err)) => {
                return Err(SynthError::MalformedMarker {
                    site: marker.site.clone(),
                    message: format!("{} rejected arguments ({}): {:#}", loaded.identity, marker.args, err),
                })
            }
            Err(panic) => {
                return Err(SynthError::GeneratorExecution {
                    identity: loaded.identity.clone(),
                    site: marker.site.clone(),
                    message: format!("constructor panicked: {}", panic_message(&*panic)),
                })
            }
        };

        if loaded.capabilities.reentrant {
            let mut instances = self.instances.lock();
            // Another invocation may have constructed one first; keep that one
            let cached = instances.get_or_insert(key, || CachedInstance {
                instance,
                _module: Arc::clone(&loaded.module),
            });
            return Ok(Arc::clone(&cached.instance));
        }
        Ok(instance)
    }

    /// Marker definitions declared by every module on the search path
    pub fn discover_markers(&self) -> Vec<MarkerDefinition> {
        let mut markers = Vec::new();
        for (index, location) in self.search_path.locations().iter().enumerate() {
            for name in location.available() {
                match self.module(index, location.as_ref(), &name) {
                    Ok(Some(module)) => markers.extend(module.markers()),
                    Ok(None) => {}
                    Err(reason) => warn!(
                        location = %location.describe(),
                        module = %name,
                        reason = %reason,
                        "Skipping module that failed to load"
                    ),
                }
            }
        }
        markers
    }

    /// Every loadable module with its exports, in search path order
    pub fn modules(&self) -> Vec<ModuleSummary> {
        let mut summaries = Vec::new();
        for (index, location) in self.search_path.locations().iter().enumerate() {
            for name in location.available() {
                if let Ok(Some(module)) = self.module(index, location.as_ref(), &name) {
                    summaries.push(ModuleSummary {
                        location: location.describe(),
                        module: name,
                        exports: module.exports(),
                    });
                }
            }
        }
        summaries
    }

    /// Number of module loads performed (cache misses)
    pub fn module_loads(&self) -> usize {
        self.module_loads.load(Ordering::SeqCst)
    }

    /// Number of generator loads performed (cache misses)
    pub fn generator_loads(&self) -> usize {
        self.generator_loads.load(Ordering::SeqCst)
    }

    fn module(
        &self,
        index: usize,
        location: &dyn ModuleLocation,
        name: &str,
    ) -> Result<Option<Arc<dyn GeneratorModule>>, String> {
        let slot = {
            let mut modules = self.modules.lock();
            Arc::clone(modules.entry((index, name.to_string())).or_default())
        };
        slot.get_or_try_init(|| {
            self.module_loads.fetch_add(1, Ordering::SeqCst);
            debug!(location = %location.describe(), module = %name, "Loading module");
            location.load(name)
        })
        .map(Option::clone)
    }

    fn load_generator(&self, identity: &GeneratorIdentity) -> Result<Arc<LoadedGenerator>, SynthError> {
        self.generator_loads.fetch_add(1, Ordering::SeqCst);

        for (index, location) in self.search_path.locations().iter().enumerate() {
            let module = self
                .module(index, location.as_ref(), &identity.module)
                .map_err(|reason| SynthError::GeneratorLoad {
                    identity: identity.clone(),
                    reason,
                })?;
            let Some(module) = module else { continue };

            match module.export(&identity.type_ref) {
                Some(ModuleExport::Generator(factory)) => {
                    let capabilities = factory.capabilities();
                    if capabilities.contract_version != CONTRACT_VERSION {
                        return Err(SynthError::GeneratorLoad {
                            identity: identity.clone(),
                            reason: format!(
                                "contract version {} is not supported (host uses {})",
                                capabilities.contract_version, CONTRACT_VERSION
                            ),
                        });
                    }
                    info!(
                        identity = %identity,
                        location = %location.describe(),
                        reentrant = capabilities.reentrant,
                        "Resolved generator"
                    );
                    return Ok(Arc::new(LoadedGenerator {
                        identity: identity.clone(),
                        location: location.describe(),
                        capabilities,
                        factory,
                        module,
                    }));
                }
                Some(ModuleExport::Other { kind }) => {
                    return Err(SynthError::GeneratorLoad {
                        identity: identity.clone(),
                        reason: format!("`{}` is a {}, not a generator", identity.type_ref, kind),
                    });
                }
                None => continue,
            }
        }

        Err(SynthError::GeneratorNotFound {
            identity: identity.clone(),
            searched: self.search_path.describe(),
        })
    }
}

fn instance_capacity(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("search_path", &self.search_path)
            .field("cached_instances", &self.cached_instances())
            .field("module_loads", &self.module_loads())
            .field("generator_loads", &self.generator_loads())
            .finish()
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Export a module from a dynamic library crate
///
/// ```ignore
/// markgen::export_module!(StaticModule::new("my_generators").with_generator("Mine", mine));
/// ```
#[macro_export]
macro_rules! export_module {
    ($module:expr) => {
        #[no_mangle]
        pub fn markgen_contract_version() -> u32 {
            $crate::generator::CONTRACT_VERSION
        }

        #[no_mangle]
        pub fn markgen_module_entry() -> ::std::boxed::Box<dyn $crate::registry::GeneratorModule> {
            ::std::boxed::Box::new($module)
        }
    };
}
