//! In-memory content store and task queue.
//!
//! Both are complete implementations of their traits and are used by the
//! integration tests and by embedders that keep content in process.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::path::is_at_or_under;
use crate::traits::{ContentStore, TaskQueue};
use crate::types::{ContentRow, MaintenanceTask, QueuedTask, RowFilter};

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    rows: RwLock<Vec<ContentRow>>,
    row_queries: AtomicUsize,
}

impl MemoryContentStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_rows(rows: Vec<ContentRow>) -> Self {
        Self { rows: RwLock::new(rows), row_queries: AtomicUsize::new(0) }
    }

    /// Insert a row, replacing the row of the same materialization.
    pub fn upsert(&self, row: ContentRow) {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        match rows.iter_mut().find(|r| r.document_id == row.document_id && r.node_id == row.node_id) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    pub fn remove_node(&self, document_id: i64, node_id: i64) {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        rows.retain(|r| !(r.document_id == document_id && r.node_id == node_id));
    }

    pub fn remove_document(&self, document_id: i64) {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        rows.retain(|r| r.document_id != document_id);
    }

    pub fn clear(&self) {
        self.rows.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Number of `select_rows` round-trips served so far.
    pub fn row_queries(&self) -> usize {
        self.row_queries.load(Ordering::SeqCst)
    }

    fn filtered<F: Fn(&ContentRow) -> bool>(&self, keep: F) -> Vec<ContentRow> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        rows.iter().filter(|r| keep(r)).cloned().collect()
    }
}

impl ContentStore for MemoryContentStore {
    fn select_by_document(&self, document_id: i64) -> Result<Vec<ContentRow>> {
        Ok(self.filtered(|r| r.document_id == document_id))
    }

    fn select_under_path(&self, site_name: &str, path_prefix: &str) -> Result<Vec<ContentRow>> {
        Ok(self.filtered(|r| r.site_name.eq_ignore_ascii_case(site_name) && is_at_or_under(&r.alias_path, path_prefix)))
    }

    fn class_name(&self, document_id: i64) -> Result<Option<String>> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(rows.iter().find(|r| r.document_id == document_id).map(|r| r.class_name.clone()))
    }

    fn select_rows(&self, class_name: &str, filter: &RowFilter) -> Result<Vec<ContentRow>> {
        self.row_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.filtered(|r| r.class_name.eq_ignore_ascii_case(class_name) && filter.matches(r)))
    }
}

#[derive(Debug, Default)]
struct QueueState {
    next_id: u64,
    pending: VecDeque<QueuedTask>,
    in_flight: BTreeMap<u64, QueuedTask>,
}

/// FIFO task queue. Dequeued tasks stay in flight until acked or released.
#[derive(Debug, Default)]
pub struct MemoryTaskQueue {
    state: Mutex<QueueState>,
}

impl MemoryTaskQueue {
    pub fn new() -> Self { Self::default() }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, task: MaintenanceTask) -> u64 {
        let mut state = self.state();
        state.next_id += 1;
        let id = state.next_id;
        state.pending.push_back(QueuedTask { id, task, attempts: 0 });
        id
    }

    pub fn pending(&self) -> usize { self.state().pending.len() }

    pub fn in_flight(&self) -> usize { self.state().in_flight.len() }
}

impl TaskQueue for MemoryTaskQueue {
    fn dequeue(&self) -> Result<Option<QueuedTask>> {
        let mut state = self.state();
        let Some(mut queued) = state.pending.pop_front() else { return Ok(None) };
        queued.attempts += 1;
        state.in_flight.insert(queued.id, queued.clone());
        Ok(Some(queued))
    }

    fn ack(&self, id: u64) -> Result<()> {
        match self.state().in_flight.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("task {} is not in flight", id))),
        }
    }

    fn release(&self, id: u64) -> Result<()> {
        let mut state = self.state();
        let queued = state
            .in_flight
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("task {} is not in flight", id)))?;
        state.pending.push_back(queued);
        Ok(())
    }
}
