//! Applies queued maintenance tasks to every index they concern.

use tracing::{debug, error, info, warn};

use sitesearch_core::error::{Error, Result};
use sitesearch_core::traits::{ContentStore, IndexWriter, SearchableEntity, TaskQueue};
use sitesearch_core::types::{ContentRow, DocumentKey, IndexDescriptor, MaintenanceTask, MaintenanceTaskKind, SubtreeKey};

use crate::delete::DeleteResolver;
use crate::planner::{plan_full_rebuild, SelectionPlan};
use crate::registry::{IndexRegistry, RegisteredIndex};
use crate::relevance::is_class_relevant;
use crate::session::{with_writer, write_document};

/// What one task did across all indexes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOutcome {
    pub indexes: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl TaskOutcome {
    fn record(&mut self, deleted: usize, updated: usize) {
        self.indexes += 1;
        self.deleted += deleted;
        self.updated += updated;
    }
}

/// Attempt from which failures are logged as errors.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug)]
pub struct TaskFailure {
    pub task_id: u64,
    pub attempts: u32,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct DrainReport {
    pub processed: usize,
    pub failures: Vec<TaskFailure>,
}

pub struct TaskDispatcher<'a> {
    store: &'a dyn ContentStore,
    max_attempts: u32,
}

impl<'a> TaskDispatcher<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store, max_attempts: DEFAULT_MAX_ATTEMPTS }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn process_task(&self, registry: &IndexRegistry, task: &MaintenanceTask) -> Result<TaskOutcome> {
        match &task.kind {
            MaintenanceTaskKind::PartialRebuild => self.rebuild_subtree(registry, task),
            MaintenanceTaskKind::Id => self.refresh_document(registry, task),
            MaintenanceTaskKind::GenericField(_) => self.delete_by_field(registry, task),
        }
    }

    /// Process every queued task. Failed tasks are returned to the queue once
    /// the queue has been emptied, so one bad task cannot spin the loop.
    /// A task failing for the `max_attempts`th time or later is reported at
    /// error level; earlier failures only warn.
    pub fn drain(&self, registry: &IndexRegistry, queue: &dyn TaskQueue) -> Result<DrainReport> {
        let mut report = DrainReport::default();
        while let Some(queued) = queue.dequeue()? {
            match self.process_task(registry, &queued.task) {
                Ok(outcome) => {
                    queue.ack(queued.id)?;
                    report.processed += 1;
                    debug!(task = queued.id, indexes = outcome.indexes, updated = outcome.updated, deleted = outcome.deleted, "task processed");
                }
                Err(e) => {
                    if queued.attempts >= self.max_attempts {
                        error!(task = queued.id, attempts = queued.attempts, value = %queued.task.value, error = %e, "maintenance task keeps failing");
                    } else {
                        warn!(task = queued.id, attempts = queued.attempts, value = %queued.task.value, error = %e, "maintenance task failed");
                    }
                    report.failures.push(TaskFailure { task_id: queued.id, attempts: queued.attempts, error: e });
                }
            }
        }
        for failure in &report.failures {
            queue.release(failure.task_id)?;
        }
        if report.processed > 0 || !report.failures.is_empty() {
            info!(processed = report.processed, failed = report.failures.len(), "task queue drained");
        }
        Ok(report)
    }

    fn rebuild_subtree(&self, registry: &IndexRegistry, task: &MaintenanceTask) -> Result<TaskOutcome> {
        let key = SubtreeKey::parse(&task.value)?;
        let resolver = DeleteResolver::new(self.store);
        let mut outcome = TaskOutcome::default();
        for index in registry.indexes() {
            let descriptor = index.descriptor();
            if !is_class_relevant(&task.object_type, &descriptor) || !descriptor.covers_site(&key.site_name) {
                continue;
            }
            let plan = plan_full_rebuild(&descriptor);
            let (deleted, updated) = self.write_partial(index, |writer| {
                let deleted = resolver.delete_item(task, index, writer)?;
                let rows = match &plan {
                    Some(_) => self.store.select_under_path(&key.site_name, &key.alias_path)?,
                    None => Vec::new(),
                };
                let mut updated = 0;
                for row in &rows {
                    if accepted(plan.as_ref(), &descriptor, row) {
                        write_document(writer, &row.search_document(&descriptor)?, false)?;
                        updated += 1;
                    }
                }
                Ok((deleted, updated))
            })?;
            outcome.record(deleted, updated);
        }
        Ok(outcome)
    }

    fn refresh_document(&self, registry: &IndexRegistry, task: &MaintenanceTask) -> Result<TaskOutcome> {
        let key = DocumentKey::parse(&task.value)?;
        let live = self.store.select_by_document(key.document_id)?;
        let class_name = self.store.class_name(key.document_id)?.unwrap_or_else(|| task.object_type.clone());
        let resolver = DeleteResolver::new(self.store);
        let mut outcome = TaskOutcome::default();
        for index in registry.indexes() {
            let descriptor = index.descriptor();
            if !is_class_relevant(&task.object_type, &descriptor) && !is_class_relevant(&class_name, &descriptor) {
                continue;
            }
            let plan = plan_full_rebuild(&descriptor);
            let (deleted, updated) = self.write_partial(index, |writer| {
                let mut deleted = resolver.delete_item(task, index, writer)?;
                let mut updated = 0;
                for row in &live {
                    if accepted(plan.as_ref(), &descriptor, row) {
                        write_document(writer, &row.search_document(&descriptor)?, false)?;
                        updated += 1;
                    } else {
                        // moved out of the index's scope
                        writer.delete_by_identity(&row.search_identity())?;
                        deleted += 1;
                    }
                }
                Ok((deleted, updated))
            })?;
            outcome.record(deleted, updated);
        }
        Ok(outcome)
    }

    fn delete_by_field(&self, registry: &IndexRegistry, task: &MaintenanceTask) -> Result<TaskOutcome> {
        let resolver = DeleteResolver::new(self.store);
        let mut outcome = TaskOutcome::default();
        for index in registry.indexes() {
            if !is_class_relevant(&task.object_type, &index.descriptor()) {
                continue;
            }
            let deleted = self.write_partial(index, |writer| resolver.delete_item(task, index, writer))?;
            outcome.record(deleted, 0);
        }
        Ok(outcome)
    }

    fn write_partial<T, F>(&self, index: &RegisteredIndex, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn IndexWriter) -> Result<T>,
    {
        let value = with_writer(index, false, f)?;
        index.touch_files();
        index.invalidate_searcher();
        Ok(value)
    }
}

fn accepted(plan: Option<&SelectionPlan>, descriptor: &IndexDescriptor, row: &ContentRow) -> bool {
    plan.is_some_and(|p| p.accepts(row)) && is_class_relevant(&row.class_name, descriptor)
}
