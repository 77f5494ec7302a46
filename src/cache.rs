//! Incremental cache of generator output
//!
//! Entries are grouped per document fingerprint. The LRU bound counts
//! documents, so one large file cannot evict its own fragments mid-run.

use crate::diagnostic::Diagnostic;
use crate::generator::SynthesizedDecl;
use crate::marker::{GeneratorIdentity, Marker, MarkerArgs};
use crate::types::Fingerprint;
use lru::LruCache;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Default number of documents kept
pub const DEFAULT_CAPACITY: usize = 64;

/// Identifies one marker's output within a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    pub identity: GeneratorIdentity,
    pub args: MarkerArgs,
    /// Qualified name of the marked declaration
    pub declaration: String,
    pub attribute_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub fingerprint: Fingerprint,
    pub fragment: FragmentKey,
}

impl CacheKey {
    pub fn for_marker(fingerprint: Fingerprint, marker: &Marker) -> Self {
        CacheKey {
            fingerprint,
            fragment: FragmentKey {
                identity: marker.identity.clone(),
                args: marker.args.clone(),
                declaration: marker.site.declaration.clone(),
                attribute_index: marker.site.attribute_index,
            },
        }
    }
}

/// Output of one successful invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFragment {
    pub declarations: Vec<SynthesizedDecl>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub documents: usize,
    pub fragments: usize,
}

type DocumentFragments = HashMap<FragmentKey, Arc<CachedFragment>>;

pub struct IncrementalCache {
    documents: RwLock<LruCache<Fingerprint, DocumentFragments>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl IncrementalCache {
    /// Cache bounded to `capacity` documents (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        IncrementalCache {
            documents: RwLock::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<CachedFragment>> {
        let found = {
            let documents = self.documents.read();
            documents
                .peek(&key.fingerprint)
                .and_then(|fragments| fragments.get(&key.fragment))
                .cloned()
        };

        match found {
            Some(fragment) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                // Recency is best effort; skip it if a writer holds the lock
                if let Some(mut documents) = self.documents.try_write() {
                    documents.promote(&key.fingerprint);
                }
                Some(fragment)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: CacheKey, fragment: CachedFragment) {
        let mut documents = self.documents.write();
        if let Some(fragments) = documents.get_mut(&key.fingerprint) {
            fragments.insert(key.fragment, Arc::new(fragment));
            return;
        }

        let mut fragments = HashMap::new();
        fragments.insert(key.fragment, Arc::new(fragment));
        if let Some((evicted, dropped)) = documents.push(key.fingerprint, fragments) {
            if evicted != key.fingerprint {
                debug!(
                    fingerprint = %evicted.short(),
                    fragments = dropped.len(),
                    "Evicted document from incremental cache"
                );
            }
        }
    }

    pub fn contains_document(&self, fingerprint: &Fingerprint) -> bool {
        self.documents.read().contains(fingerprint)
    }

    pub fn capacity(&self) -> usize {
        self.documents.read().cap().get()
    }

    pub fn stats(&self) -> CacheStats {
        let documents = self.documents.read();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            documents: documents.len(),
            fragments: documents.iter().map(|(_, fragments)| fragments.len()).sum(),
        }
    }

    pub fn clear(&self) {
        self.documents.write().clear();
    }
}

impl Default for IncrementalCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
