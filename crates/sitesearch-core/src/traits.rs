use std::sync::Arc;

use crate::error::Result;
use crate::types::{
    ContentRow, HitFilter, IndexDescriptor, QueuedTask, RequestContext, RowFilter, SearchHit, SearchQuery,
    SearchableDocument,
};

/// Source of truth for indexed content.
pub trait ContentStore: Send + Sync {
    /// Every live materialization of a document (one row per linked alias).
    fn select_by_document(&self, document_id: i64) -> Result<Vec<ContentRow>>;
    /// Live rows of `site_name` at or under `path_prefix`, in tree order.
    fn select_under_path(&self, site_name: &str, path_prefix: &str) -> Result<Vec<ContentRow>>;
    fn class_name(&self, document_id: i64) -> Result<Option<String>>;
    /// One batched lookup of rows of a single class.
    fn select_rows(&self, class_name: &str, filter: &RowFilter) -> Result<Vec<ContentRow>>;
}

/// An entity that can be projected into an index.
pub trait SearchableEntity {
    fn search_identity(&self) -> String;
    fn search_document(&self, descriptor: &IndexDescriptor) -> Result<SearchableDocument>;
}

/// Write handle of one index. At most one is open per index at a time.
pub trait IndexWriter: Send {
    fn add(&mut self, doc: &SearchableDocument) -> Result<()>;
    /// Delete-then-insert; leaves at most one live record per identity.
    fn update_by_identity(&mut self, identity: &str, doc: &SearchableDocument) -> Result<()>;
    fn delete_by_identity(&mut self, identity: &str) -> Result<()>;
    fn delete_by_field(&mut self, field: &str, value: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn optimize(&mut self) -> Result<()>;
    fn close(self: Box<Self>) -> Result<()>;
}

pub trait IndexSearcher: Send + Sync {
    fn search(&self, query: &SearchQuery, filter: Option<&HitFilter>, limit: usize) -> Result<Vec<SearchHit>>;
    fn number_of_documents(&self) -> Result<u64>;
}

pub trait IndexBackend: Send + Sync {
    /// `full` opens the writer in replace mode: flushing drops every record
    /// that was not added through this writer.
    fn open_writer(&self, full: bool) -> Result<Box<dyn IndexWriter>>;
    /// `fresh` forces the searcher to observe the latest flushed state.
    fn open_searcher(&self, fresh: bool) -> Result<Arc<dyn IndexSearcher>>;
}

pub trait PermissionOracle: Send + Sync {
    fn is_allowed(&self, ctx: &RequestContext, hit: &SearchHit) -> bool;
}

impl<F> PermissionOracle for F
where
    F: Fn(&RequestContext, &SearchHit) -> bool + Send + Sync,
{
    fn is_allowed(&self, ctx: &RequestContext, hit: &SearchHit) -> bool {
        self(ctx, hit)
    }
}

/// Oracle that lets every hit through.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionOracle for AllowAll {
    fn is_allowed(&self, _ctx: &RequestContext, _hit: &SearchHit) -> bool {
        true
    }
}

/// Durable log of pending maintenance tasks.
pub trait TaskQueue: Send + Sync {
    /// Hand out the oldest pending task with its attempt count bumped.
    fn dequeue(&self) -> Result<Option<QueuedTask>>;
    /// The task was processed; remove it for good.
    fn ack(&self, id: u64) -> Result<()>;
    /// The task failed; make it available again.
    fn release(&self, id: u64) -> Result<()>;
}
