//! Orchestrator: drives one document through scan, resolve, invoke, compose and publish.
//! Owns cancellation scoping and publication ordering; generator behavior stays in the invoker.

use crate::cache::{CacheKey, CachedFragment, IncrementalCache};
use crate::composer::{self, CollisionPolicy};
use crate::config::MarkgenConfig;
use crate::document::{Document, DocumentContext};
use crate::error::SynthError;
use crate::invoker::{self, GenerationOutcome};
use crate::marker::MarkerCatalog;
use crate::registry::{GeneratorRegistry, SearchPath};
use crate::scanner::{self, ScanOutput};
use crate::unit::SynthesizedUnit;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tunables for regeneration
#[derive(Debug, Clone)]
pub struct RegenerationSettings {
    /// Upper bound on generator invocations running at once, across documents
    pub max_concurrent_invocations: usize,
    /// Tie-break for two markers on one declaration producing the same name
    pub collision_policy: CollisionPolicy,
    /// Deadline applied by [`Orchestrator::regenerate_bounded`]
    pub timeout: Option<Duration>,
}

impl Default for RegenerationSettings {
    fn default() -> Self {
        RegenerationSettings {
            max_concurrent_invocations: 8,
            collision_policy: CollisionPolicy::Error,
            timeout: None,
        }
    }
}

struct Published {
    sequence: u64,
    unit: Arc<SynthesizedUnit>,
}

pub struct Orchestrator {
    registry: Arc<GeneratorRegistry>,
    catalog: Arc<MarkerCatalog>,
    cache: Arc<IncrementalCache>,
    settings: RegenerationSettings,
    limiter: Arc<Semaphore>,
    published: RwLock<HashMap<PathBuf, Published>>,
    sequence: AtomicU64,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .field("cache", &self.cache.stats())
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .finish()
    }
}

impl Orchestrator {
    pub fn new(registry: Arc<GeneratorRegistry>, catalog: MarkerCatalog) -> Self {
        let settings = RegenerationSettings::default();
        Orchestrator {
            registry,
            catalog: Arc::new(catalog),
            cache: Arc::new(IncrementalCache::default()),
            limiter: Arc::new(Semaphore::new(settings.max_concurrent_invocations)),
            settings,
            published: RwLock::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Registry over `search_path`, with markers declared by its modules
    pub fn with_search_path(search_path: SearchPath) -> Result<Self, SynthError> {
        let registry = Arc::new(GeneratorRegistry::new(search_path));
        let mut catalog = MarkerCatalog::new();
        for definition in registry.discover_markers() {
            catalog.register(definition)?;
        }
        Ok(Self::new(registry, catalog))
    }

    /// Build the full pipeline from configuration
    pub fn from_config(config: &MarkgenConfig) -> Result<Self, SynthError> {
        let search_path = SearchPath::from_config(&config.search_path)?;
        let registry = Arc::new(GeneratorRegistry::new(search_path));

        let mut catalog = MarkerCatalog::new();
        for definition in registry.discover_markers() {
            catalog.register(definition)?;
        }
        for marker in &config.markers {
            catalog.register(marker.to_definition())?;
        }

        info!(
            search_path = ?registry.search_path(),
            markers = catalog.len(),
            cache_capacity = config.cache.capacity,
            "Initialized orchestrator"
        );

        Ok(Self::new(registry, catalog)
            .with_cache(Arc::new(IncrementalCache::new(config.cache.capacity)))
            .with_settings(config.regeneration.settings()))
    }

    pub fn with_cache(mut self, cache: Arc<IncrementalCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_settings(mut self, settings: RegenerationSettings) -> Self {
        self.limiter = Arc::new(Semaphore::new(settings.max_concurrent_invocations.max(1)));
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &Arc<GeneratorRegistry> {
        &self.registry
    }

    pub fn catalog(&self) -> &MarkerCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<IncrementalCache> {
        &self.cache
    }

    pub fn settings(&self) -> &RegenerationSettings {
        &self.settings
    }

    /// Recognized markers of a document, without invoking anything
    pub fn scan(&self, document: &Document) -> ScanOutput {
        scanner::scan(document, &self.catalog)
    }

    /// The unit currently visible for `path`
    pub fn published(&self, path: &Path) -> Option<Arc<SynthesizedUnit>> {
        self.published.read().get(path).map(|p| Arc::clone(&p.unit))
    }

    /// Regenerate a document and publish the result.
    ///
    /// Per-marker failures become diagnostics on the unit. Collisions,
    /// cancellation and task failures return an error and leave the previously
    /// published unit in place. Dropping the returned future cancels every
    /// invocation it started.
    pub async fn regenerate(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<Arc<SynthesizedUnit>, SynthError> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let scope = cancel.child_token();
        let _guard = scope.clone().drop_guard();
        let started = Instant::now();

        if scope.is_cancelled() {
            return Err(SynthError::RegenerationCancelled);
        }

        let context = Arc::new(DocumentContext::new(
            document,
            self.catalog.attributes(),
        ));
        let scan = self.scan(document);
        info!(
            document = %document.path().display(),
            fingerprint = %document.fingerprint().short(),
            markers = scan.len(),
            sequence,
            "Regenerating document"
        );

        let mut outcomes = Vec::with_capacity(scan.len());
        for rejected in scan.rejected {
            outcomes.push(GenerationOutcome::failed(
                rejected.site,
                rejected.identity,
                rejected.error,
            ));
        }

        let mut invocations = FuturesUnordered::new();
        let mut cache_hits = 0usize;
        for marked in scan.marked {
            let key = CacheKey::for_marker(document.fingerprint(), &marked.marker);
            if let Some(fragment) = self.cache.get(&key) {
                debug!(site = %marked.site(), identity = %marked.identity(), "Cache hit");
                cache_hits += 1;
                outcomes.push(GenerationOutcome {
                    site: marked.site().clone(),
                    identity: marked.identity().clone(),
                    result: Ok(fragment.declarations.clone()),
                    diagnostics: fragment.diagnostics.clone(),
                    cached: true,
                });
                continue;
            }

            let (loaded, instance) = match self.registry.resolve(marked.identity()).and_then(|loaded| {
                let instance = self.registry.instantiate(&loaded, &marked.marker)?;
                Ok((loaded, instance))
            }) {
                Ok(resolved) => resolved,
                Err(err) => {
                    warn!(site = %marked.site(), error = %err, "Marker cannot be invoked");
                    outcomes.push(GenerationOutcome::failed(
                        marked.site().clone(),
                        marked.identity().clone(),
                        err,
                    ));
                    continue;
                }
            };

            let site = marked.site().clone();
            let identity = marked.identity().clone();
            let limiter = Arc::clone(&self.limiter);
            let context = Arc::clone(&context);
            let token = scope.clone();
            let handle = tokio::spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return GenerationOutcome::failed(
                            marked.site().clone(),
                            marked.identity().clone(),
                            SynthError::RegenerationCancelled,
                        );
                    }
                    permit = limiter.acquire_owned() => permit,
                };
                let outcome = invoker::invoke(instance, marked, context, token).await;
                // The generator's module stays loaded until its instance is gone
                drop(loaded);
                outcome
            });
            invocations.push(async move { (site, identity, key, handle.await) });
        }

        while let Some((site, identity, key, joined)) = invocations.next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(join_error) => GenerationOutcome::failed(
                    site.clone(),
                    identity.clone(),
                    SynthError::GeneratorExecution {
                        identity,
                        site,
                        message: format!("invocation task failed: {}", join_error),
                    },
                ),
            };

            if outcome.is_cancelled() {
                info!(document = %document.path().display(), sequence, "Regeneration cancelled");
                return Err(SynthError::RegenerationCancelled);
            }

            if let Ok(declarations) = &outcome.result {
                self.cache.put(
                    key,
                    CachedFragment {
                        declarations: declarations.clone(),
                        diagnostics: outcome.diagnostics.clone(),
                    },
                );
            }
            outcomes.push(outcome);
        }

        // Cancellation that lands after the last invocation still discards the run
        if scope.is_cancelled() {
            return Err(SynthError::RegenerationCancelled);
        }

        let unit = match composer::compose(&context, outcomes, self.settings.collision_policy) {
            Ok(unit) => Arc::new(unit),
            Err(err) => {
                warn!(
                    document = %document.path().display(),
                    error = %err,
                    "Composition failed, keeping previous output"
                );
                return Err(err);
            }
        };

        self.publish(document.path(), sequence, Arc::clone(&unit));
        info!(
            document = %document.path().display(),
            declarations = unit.declarations.len(),
            diagnostics = unit.diagnostics.len(),
            cache_hits,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Regeneration complete"
        );
        Ok(unit)
    }

    /// Regenerate, cancelling if `deadline` passes first
    pub async fn regenerate_with_deadline(
        &self,
        document: &Document,
        cancel: &CancellationToken,
        deadline: Duration,
    ) -> Result<Arc<SynthesizedUnit>, SynthError> {
        let scope = cancel.child_token();
        tokio::select! {
            result = self.regenerate(document, &scope) => result,
            _ = tokio::time::sleep(deadline) => {
                warn!(
                    document = %document.path().display(),
                    deadline_ms = deadline.as_millis() as u64,
                    "Regeneration deadline exceeded"
                );
                scope.cancel();
                Err(SynthError::RegenerationCancelled)
            }
        }
    }

    /// Regenerate under the configured timeout, if any
    pub async fn regenerate_bounded(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<Arc<SynthesizedUnit>, SynthError> {
        match self.settings.timeout {
            Some(deadline) => self.regenerate_with_deadline(document, cancel, deadline).await,
            None => self.regenerate(document, cancel).await,
        }
    }

    fn publish(&self, path: &Path, sequence: u64, unit: Arc<SynthesizedUnit>) {
        let mut published = self.published.write();
        if let Some(current) = published.get(path) {
            if current.sequence > sequence {
                debug!(
                    document = %path.display(),
                    sequence,
                    newer = current.sequence,
                    "Newer regeneration already published"
                );
                return;
            }
        }
        published.insert(path.to_path_buf(), Published { sequence, unit });
    }
}
