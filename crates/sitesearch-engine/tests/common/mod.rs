#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use sitesearch_core::error::{Error, Result};
use sitesearch_core::memory::MemoryContentStore;
use sitesearch_core::traits::{ContentStore, IndexBackend, IndexSearcher, IndexWriter};
use sitesearch_core::types::{ContentRow, IndexDescriptor, RowFilter, SearchQuery, SearchableDocument};
use sitesearch_engine::{IndexRegistry, RegisteredIndex};
use sitesearch_text::TantivyBackend;

pub const HEAP: usize = 15_000_000;
pub const SITE: &str = "S1";

pub fn row(document_id: i64, node_id: i64, class_name: &str, path: &str) -> ContentRow {
    ContentRow {
        class_name: class_name.to_string(),
        document_id,
        node_id,
        linked_node_id: None,
        alias_path: path.to_string(),
        site_id: 1,
        site_name: SITE.to_string(),
        culture: "en-US".to_string(),
        document_name: format!("Document {} at {}", document_id, path),
        columns: BTreeMap::new(),
    }
}

/// A linked alias of `document_id` living at its own node.
pub fn alias(document_id: i64, node_id: i64, linked_to: i64, class_name: &str, path: &str) -> ContentRow {
    ContentRow { linked_node_id: Some(linked_to), ..row(document_id, node_id, class_name, path) }
}

pub fn site_index(name: &str) -> IndexDescriptor {
    IndexDescriptor::new(name).with_scope(1, SITE, "en-US").allow(SITE, "/%", &[])
}

pub fn ram_registry(descriptor: IndexDescriptor) -> (IndexRegistry, Arc<RegisteredIndex>) {
    let backend = TantivyBackend::in_ram(&descriptor.name, HEAP).expect("ram backend");
    let mut registry = IndexRegistry::new();
    let index = registry.register(descriptor, Arc::new(backend)).expect("register");
    (registry, index)
}

/// Identities currently committed, sorted.
pub fn indexed(index: &RegisteredIndex) -> Vec<String> {
    let searcher = index.backend().open_searcher(true).expect("searcher");
    let total = searcher.number_of_documents().expect("count") as usize;
    let mut ids: Vec<String> =
        searcher.search(&SearchQuery::new(), None, total).expect("search").into_iter().map(|h| h.identity).collect();
    ids.sort();
    ids
}

/// Tantivy backend whose writers report how often they were closed and can
/// be told to fail on flush.
pub struct CountingBackend {
    inner: TantivyBackend,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
    pub fail_flush: Arc<AtomicBool>,
}

impl CountingBackend {
    pub fn new(name: &str) -> Self {
        Self {
            inner: TantivyBackend::in_ram(name, HEAP).expect("ram backend"),
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            fail_flush: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn opened(&self) -> usize { self.opened.load(Ordering::SeqCst) }

    pub fn closed(&self) -> usize { self.closed.load(Ordering::SeqCst) }
}

impl IndexBackend for CountingBackend {
    fn open_writer(&self, full: bool) -> Result<Box<dyn IndexWriter>> {
        let inner = self.inner.open_writer(full)?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingWriter { inner, closed: Arc::clone(&self.closed), fail_flush: Arc::clone(&self.fail_flush) }))
    }

    fn open_searcher(&self, fresh: bool) -> Result<Arc<dyn IndexSearcher>> {
        self.inner.open_searcher(fresh)
    }
}

struct CountingWriter {
    inner: Box<dyn IndexWriter>,
    closed: Arc<AtomicUsize>,
    fail_flush: Arc<AtomicBool>,
}

impl IndexWriter for CountingWriter {
    fn add(&mut self, doc: &SearchableDocument) -> Result<()> { self.inner.add(doc) }

    fn update_by_identity(&mut self, identity: &str, doc: &SearchableDocument) -> Result<()> {
        self.inner.update_by_identity(identity, doc)
    }

    fn delete_by_identity(&mut self, identity: &str) -> Result<()> { self.inner.delete_by_identity(identity) }

    fn delete_by_field(&mut self, field: &str, value: &str) -> Result<()> { self.inner.delete_by_field(field, value) }

    fn flush(&mut self) -> Result<()> {
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(Error::streaming("counting", "disk full"));
        }
        self.inner.flush()
    }

    fn optimize(&mut self) -> Result<()> { self.inner.optimize() }

    fn close(self: Box<Self>) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

/// Memory store that can be switched into failing every read.
#[derive(Default)]
pub struct FlakyStore {
    pub rows: MemoryContentStore,
    pub failing: AtomicBool,
}

impl FlakyStore {
    pub fn with_rows(rows: Vec<ContentRow>) -> Self {
        Self { rows: MemoryContentStore::with_rows(rows), failing: AtomicBool::new(false) }
    }

    pub fn fail(&self, failing: bool) { self.failing.store(failing, Ordering::SeqCst) }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::ContentStore("connection reset".to_string()));
        }
        Ok(())
    }
}

impl ContentStore for FlakyStore {
    fn select_by_document(&self, document_id: i64) -> Result<Vec<ContentRow>> {
        self.check()?;
        self.rows.select_by_document(document_id)
    }

    fn select_under_path(&self, site_name: &str, path_prefix: &str) -> Result<Vec<ContentRow>> {
        self.check()?;
        self.rows.select_under_path(site_name, path_prefix)
    }

    fn class_name(&self, document_id: i64) -> Result<Option<String>> {
        self.check()?;
        self.rows.class_name(document_id)
    }

    fn select_rows(&self, class_name: &str, filter: &RowFilter) -> Result<Vec<ContentRow>> {
        self.check()?;
        self.rows.select_rows(class_name, filter)
    }
}
