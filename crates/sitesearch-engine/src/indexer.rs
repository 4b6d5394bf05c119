use std::collections::HashSet;

use tracing::info;

use sitesearch_core::error::Result;
use sitesearch_core::traits::{ContentStore, SearchableEntity};

use crate::planner::plan_full_rebuild;
use crate::registry::{IndexRegistry, RegisteredIndex};
use crate::relevance::is_class_relevant;
use crate::session::{stream_documents, with_writer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// The index has nothing configured to index.
    Skipped,
    Completed { documents: usize },
}

/// Full rebuilds from the content store.
pub struct Indexer<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> Indexer<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    pub fn rebuild(&self, registry: &IndexRegistry, name: &str) -> Result<RebuildOutcome> {
        let index = registry.get(name)?;
        self.rebuild_index(&index)
    }

    pub fn rebuild_index(&self, index: &RegisteredIndex) -> Result<RebuildOutcome> {
        let descriptor = index.descriptor();
        let Some(plan) = plan_full_rebuild(&descriptor) else {
            info!(index = %descriptor.name, "nothing configured to index; rebuild skipped");
            return Ok(RebuildOutcome::Skipped);
        };

        let documents = with_writer(index, true, |writer| {
            let mut seen = HashSet::new();
            let mut written = 0;
            for rule in &plan.allowed {
                let rows = self.store.select_under_path(&rule.site_name, &rule.prefix)?;
                let docs = rows
                    .into_iter()
                    .filter(|row| plan.accepts(row) && is_class_relevant(&row.class_name, &descriptor))
                    // overlapping allowed subtrees yield the same row twice
                    .filter(|row| seen.insert(row.search_identity()))
                    .map(|row| row.search_document(&descriptor));
                written += stream_documents(writer, docs, true)?;
            }
            Ok(written)
        })?;

        index.invalidate_searcher();
        info!(index = %descriptor.name, documents, "full rebuild completed");
        Ok(RebuildOutcome::Completed { documents })
    }

    /// Rebuild every registered index; one failure does not stop the others.
    pub fn rebuild_all(&self, registry: &IndexRegistry) -> Vec<(String, Result<RebuildOutcome>)> {
        registry.indexes().map(|index| (index.name(), self.rebuild_index(index))).collect()
    }
}
