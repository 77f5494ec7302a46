//! Shared test utilities for integration tests
//!
//! Fixture generators with controllable timing and failure modes, plus
//! environment isolation for tests that load configuration.

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use markgen::document::DeclKind;
use markgen::generator::{
    GenerationContext, Generator, GeneratorCapabilities, GeneratorFactory, SynthesizedDecl,
};
use markgen::marker::MarkerArgs;
use markgen::registry::{GeneratorInstance, ModuleExport};
use markgen::{Document, Orchestrator, SearchPath, StaticLocation, StaticModule};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tempfile::TempDir;

pub const FIXTURE_MODULE: &str = "fixtures";

/// Invocation and construction counts shared with the fixture generators
#[derive(Debug, Default)]
pub struct Counters {
    pub invocations: AtomicUsize,
    pub instantiations: AtomicUsize,
    pub hanging: AtomicUsize,
}

impl Counters {
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn instantiations(&self) -> usize {
        self.instantiations.load(Ordering::SeqCst)
    }

    pub fn hanging(&self) -> usize {
        self.hanging.load(Ordering::SeqCst)
    }
}

fn string_arg(args: &MarkerArgs, index: usize, key: &str) -> anyhow::Result<String> {
    args.get(index, key)
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("expected a string argument `{}`", key))
}

/// `#[emit("Name")]`: emits `pub struct Name;`
struct Emit {
    name: String,
    counters: Arc<Counters>,
}

#[async_trait]
impl Generator for Emit {
    async fn generate(&self, cx: GenerationContext) -> anyhow::Result<Vec<SynthesizedDecl>> {
        self.counters.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(vec![cx.synthesize(format!("pub struct {};", self.name))?])
    }
}

/// `#[delayed(ms, "Suffix")]`: sleeps, then emits `<Decl><Suffix>`
struct Delayed {
    delay: Duration,
    suffix: String,
}

#[async_trait]
impl Generator for Delayed {
    async fn generate(&self, cx: GenerationContext) -> anyhow::Result<Vec<SynthesizedDecl>> {
        tokio::time::sleep(self.delay).await;
        cx.checkpoint().await?;
        Ok(vec![cx.synthesize(format!(
            "pub struct {}{};",
            cx.declaration.name, self.suffix
        ))?])
    }
}

/// `#[hang]`: waits for cancellation and never produces output
struct Hang {
    counters: Arc<Counters>,
}

#[async_trait]
impl Generator for Hang {
    async fn generate(&self, cx: GenerationContext) -> anyhow::Result<Vec<SynthesizedDecl>> {
        self.counters.hanging.fetch_add(1, Ordering::SeqCst);
        cx.cancel.cancelled().await;
        cx.checkpoint().await?;
        Ok(Vec::new())
    }
}

/// `#[panics]`
struct Panics;

#[async_trait]
impl Generator for Panics {
    async fn generate(&self, _cx: GenerationContext) -> anyhow::Result<Vec<SynthesizedDecl>> {
        panic!("fixture generator exploded");
    }
}

/// `#[fails]`
struct Fails;

#[async_trait]
impl Generator for Fails {
    async fn generate(&self, cx: GenerationContext) -> anyhow::Result<Vec<SynthesizedDecl>> {
        bail!("cannot handle `{}`", cx.declaration.name)
    }
}

/// `#[warns]`: reports a warning and an info, emits nothing
struct Warns;

#[async_trait]
impl Generator for Warns {
    async fn generate(&self, cx: GenerationContext) -> anyhow::Result<Vec<SynthesizedDecl>> {
        cx.diagnostics.warning(format!("`{}` looks suspicious", cx.declaration.name));
        cx.diagnostics.info("nothing to generate");
        Ok(Vec::new())
    }
}

/// `#[counted]`: non-reentrant, emits `<Decl>Counted`
struct CountedFactory {
    counters: Arc<Counters>,
}

struct Counted {
    counters: Arc<Counters>,
}

impl GeneratorFactory for CountedFactory {
    fn capabilities(&self) -> GeneratorCapabilities {
        GeneratorCapabilities::default()
    }

    fn instantiate(&self, _args: &MarkerArgs) -> anyhow::Result<GeneratorInstance> {
        self.counters.instantiations.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Counted {
            counters: Arc::clone(&self.counters),
        }))
    }
}

#[async_trait]
impl Generator for Counted {
    async fn generate(&self, cx: GenerationContext) -> anyhow::Result<Vec<SynthesizedDecl>> {
        self.counters.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(vec![cx.synthesize(format!("pub struct {}Counted;", cx.declaration.name))?])
    }
}

/// Module exporting every fixture generator, plus markers for identities it
/// does not export (`#[missing]`) or exports as a non-generator (`#[wrongkind]`)
pub fn fixture_module(counters: &Arc<Counters>) -> StaticModule {
    let emit_counters = Arc::clone(counters);
    let hang_counters = Arc::clone(counters);
    StaticModule::new(FIXTURE_MODULE)
        .with_generator("Emit", move |args: &MarkerArgs| -> anyhow::Result<GeneratorInstance> {
            Ok(Arc::new(Emit {
                name: string_arg(args, 0, "name")?,
                counters: Arc::clone(&emit_counters),
            }))
        })
        .with_generator("Delayed", |args: &MarkerArgs| -> anyhow::Result<GeneratorInstance> {
            let ms = args
                .get(0, "ms")
                .and_then(|value| value.as_int())
                .ok_or_else(|| anyhow!("expected a delay in milliseconds"))?;
            Ok(Arc::new(Delayed {
                delay: Duration::from_millis(u64::try_from(ms)?),
                suffix: string_arg(args, 1, "suffix")?,
            }))
        })
        .with_generator("Hang", move |_: &MarkerArgs| -> anyhow::Result<GeneratorInstance> {
            Ok(Arc::new(Hang {
                counters: Arc::clone(&hang_counters),
            }))
        })
        .with_generator("Panics", |_: &MarkerArgs| -> anyhow::Result<GeneratorInstance> {
            Ok(Arc::new(Panics))
        })
        .with_generator("Fails", |_: &MarkerArgs| -> anyhow::Result<GeneratorInstance> {
            Ok(Arc::new(Fails))
        })
        .with_generator("Warns", |_: &MarkerArgs| -> anyhow::Result<GeneratorInstance> {
            Ok(Arc::new(Warns))
        })
        .with_generator(
            "Counted",
            CountedFactory {
                counters: Arc::clone(counters),
            },
        )
        .with_export("Settings", ModuleExport::Other { kind: "struct".to_string() })
        .with_marker("emit", "Emit", [])
        .with_marker("delayed", "Delayed", [])
        .with_marker("hang", "Hang", [])
        .with_marker("panics", "Panics", [])
        .with_marker("fails", "Fails", [])
        .with_marker("warns", "Warns", [])
        .with_marker("counted", "Counted", [DeclKind::Struct])
        .with_marker("missing", "Missing", [])
        .with_marker("wrongkind", "Settings", [])
}

/// Orchestrator over the built-in module and the fixture module
pub fn fixture_orchestrator() -> (Orchestrator, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    let search_path = SearchPath::new()
        .with_location(StaticLocation::builtin())
        .with_location(
            StaticLocation::new("fixtures").with_module(Arc::new(fixture_module(&counters))),
        );
    let orchestrator = Orchestrator::with_search_path(search_path)
        .expect("fixture markers do not conflict with built-in markers");
    (orchestrator, counters)
}

pub fn document(source: &str) -> Document {
    Document::parse("src/lib.rs", source).expect("fixture source parses")
}

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Isolated config home; restores the environment on drop
pub struct IsolatedEnv {
    _guard: MutexGuard<'static, ()>,
    saved: Vec<(&'static str, Option<String>)>,
    pub dir: TempDir,
}

impl IsolatedEnv {
    pub fn new() -> Self {
        let guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let dir = TempDir::new().unwrap();
        let mut env = IsolatedEnv {
            _guard: guard,
            saved: Vec::new(),
            dir,
        };
        let xdg = env.dir.path().join("xdg");
        env.set("XDG_CONFIG_HOME", Some(xdg.to_str().unwrap()));
        env.set("MARKGEN_ENV", None);
        env
    }

    pub fn set(&mut self, key: &'static str, value: Option<&str>) {
        self.saved.push((key, std::env::var(key).ok()));
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }

    pub fn workspace(&self) -> std::path::PathBuf {
        let workspace = self.dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).unwrap();
        workspace
    }
}

impl Drop for IsolatedEnv {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}
