//! Explicit registry of maintained indexes.
//!
//! Every engine call receives the registry by reference; there is no
//! process-wide state. Each entry owns the descriptor (the only mutable
//! shared state), the backend, the writer mutex serializing writer sessions
//! and the cached searcher of the read path.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use tracing::{debug, info};

use sitesearch_core::config::EngineSettings;
use sitesearch_core::error::{Error, Result};
use sitesearch_core::traits::{IndexBackend, IndexSearcher};
use sitesearch_core::types::{BackendKind, IndexDescriptor, IndexStatus};
use sitesearch_text::TantivyBackend;

#[derive(Default)]
struct SearcherSlot {
    cached: Option<Arc<dyn IndexSearcher>>,
    stale: bool,
}

pub struct RegisteredIndex {
    descriptor: RwLock<IndexDescriptor>,
    backend: Arc<dyn IndexBackend>,
    writer_lock: Mutex<()>,
    searcher: Mutex<SearcherSlot>,
}

impl RegisteredIndex {
    pub fn new(descriptor: IndexDescriptor, backend: Arc<dyn IndexBackend>) -> Self {
        Self {
            descriptor: RwLock::new(descriptor),
            backend,
            writer_lock: Mutex::new(()),
            searcher: Mutex::new(SearcherSlot::default()),
        }
    }

    pub fn name(&self) -> String {
        self.descriptor.read().unwrap_or_else(PoisonError::into_inner).name.clone()
    }

    /// Snapshot of the current descriptor.
    pub fn descriptor(&self) -> IndexDescriptor {
        self.descriptor.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn status(&self) -> IndexStatus {
        self.descriptor.read().unwrap_or_else(PoisonError::into_inner).status
    }

    pub fn backend(&self) -> &dyn IndexBackend {
        self.backend.as_ref()
    }

    pub(crate) fn set_status(&self, status: IndexStatus) {
        let mut descriptor = self.descriptor.write().unwrap_or_else(PoisonError::into_inner);
        debug!(index = %descriptor.name, from = ?descriptor.status, to = ?status, "index status");
        descriptor.status = status;
    }

    pub(crate) fn mark_rebuilt(&self) {
        let now = Utc::now();
        let mut descriptor = self.descriptor.write().unwrap_or_else(PoisonError::into_inner);
        descriptor.status = IndexStatus::Ready;
        descriptor.last_updated = Some(now);
        descriptor.files_last_changed = Some(now);
    }

    pub(crate) fn touch_files(&self) {
        self.descriptor.write().unwrap_or_else(PoisonError::into_inner).files_last_changed = Some(Utc::now());
    }

    /// Held for the whole of a writer session.
    pub(crate) fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached searcher of the read path; reopened fresh after invalidation.
    pub fn searcher(&self) -> Result<Arc<dyn IndexSearcher>> {
        let mut slot = self.searcher.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = &slot.cached {
            return Ok(Arc::clone(cached));
        }
        let searcher = self.backend.open_searcher(slot.stale)?;
        slot.cached = Some(Arc::clone(&searcher));
        slot.stale = false;
        Ok(searcher)
    }

    pub fn invalidate_searcher(&self) {
        let mut slot = self.searcher.lock().unwrap_or_else(PoisonError::into_inner);
        slot.cached = None;
        slot.stale = true;
    }
}

#[derive(Default)]
pub struct IndexRegistry {
    indexes: BTreeMap<String, Arc<RegisteredIndex>>,
}

impl IndexRegistry {
    pub fn new() -> Self { Self::default() }

    /// Open a tantivy backend under `settings.index_root` for every descriptor.
    pub fn open_from_settings(settings: &EngineSettings, base: &Path, descriptors: Vec<IndexDescriptor>) -> Result<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            let backend: Arc<dyn IndexBackend> = match descriptor.backend {
                BackendKind::Tantivy => {
                    let dir = settings.index_dir(base, &descriptor.name);
                    Arc::new(TantivyBackend::open(&descriptor.name, &dir, settings.writer_memory_bytes)?)
                }
            };
            registry.register(descriptor, backend)?;
        }
        info!(indexes = registry.len(), "index registry opened");
        Ok(registry)
    }

    pub fn register(&mut self, descriptor: IndexDescriptor, backend: Arc<dyn IndexBackend>) -> Result<Arc<RegisteredIndex>> {
        let key = descriptor.name.to_ascii_lowercase();
        if self.indexes.contains_key(&key) {
            return Err(Error::InvalidConfig(format!("index '{}' is already registered", descriptor.name)));
        }
        let entry = Arc::new(RegisteredIndex::new(descriptor, backend));
        self.indexes.insert(key, Arc::clone(&entry));
        Ok(entry)
    }

    pub fn get(&self, name: &str) -> Result<Arc<RegisteredIndex>> {
        self.indexes
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("index '{}'", name)))
    }

    pub fn indexes(&self) -> impl Iterator<Item = &Arc<RegisteredIndex>> {
        self.indexes.values()
    }

    pub fn len(&self) -> usize { self.indexes.len() }

    pub fn is_empty(&self) -> bool { self.indexes.is_empty() }
}
