//! Removal of index records for a maintenance task.
//!
//! The content store is the source of truth: records are removed only for
//! materializations that are no longer live there.

use std::collections::HashSet;

use tracing::debug;

use sitesearch_core::error::Result;
use sitesearch_core::traits::{ContentStore, IndexWriter, SearchableEntity};
use sitesearch_core::types::{
    field, search_identity, DocumentKey, HitFilter, MaintenanceTask, MaintenanceTaskKind, SearchHit, SearchQuery,
    SubtreeKey,
};

use crate::registry::RegisteredIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteStrategy {
    /// Every stale materialization of a document, linked aliases included.
    LinkedAware(DocumentKey),
    /// Every record of a site at or under an alias path.
    SubtreePrefix(SubtreeKey),
    /// A raw term delete.
    Field { name: String, value: String },
}

impl DeleteStrategy {
    pub fn for_task(task: &MaintenanceTask) -> Result<Self> {
        Ok(match &task.kind {
            MaintenanceTaskKind::Id => DeleteStrategy::LinkedAware(DocumentKey::parse(&task.value)?),
            MaintenanceTaskKind::PartialRebuild => DeleteStrategy::SubtreePrefix(SubtreeKey::parse(&task.value)?),
            MaintenanceTaskKind::GenericField(name) => {
                DeleteStrategy::Field { name: name.clone(), value: task.value.clone() }
            }
        })
    }
}

pub struct DeleteResolver<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> DeleteResolver<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Returns the number of identities or terms targeted.
    pub fn delete_item(&self, task: &MaintenanceTask, index: &RegisteredIndex, writer: &mut dyn IndexWriter) -> Result<usize> {
        let removed = match DeleteStrategy::for_task(task)? {
            DeleteStrategy::LinkedAware(key) => self.delete_stale_materializations(&key, index, writer)?,
            DeleteStrategy::SubtreePrefix(key) => delete_subtree(&key, index, writer)?,
            DeleteStrategy::Field { name, value } => {
                writer.delete_by_field(&name, &value)?;
                1
            }
        };
        debug!(index = %index.name(), task = %task.value, removed, "delete resolved");
        Ok(removed)
    }

    fn delete_stale_materializations(&self, key: &DocumentKey, index: &RegisteredIndex, writer: &mut dyn IndexWriter) -> Result<usize> {
        let live = self.store.select_by_document(key.document_id)?;
        let document_id = key.document_id.to_string();

        if live.is_empty() {
            if indexed_records(index, &document_id)?.is_empty() {
                return Ok(0);
            }
            writer.delete_by_field(field::DOCUMENT_ID, &document_id)?;
            return Ok(1);
        }

        if let Some(node_id) = key.node_id {
            if live.iter().any(|row| row.node_id == node_id) {
                return Ok(0);
            }
            writer.delete_by_identity(&search_identity(key.document_id, node_id))?;
            return Ok(1);
        }

        let live_identities: HashSet<String> = live.iter().map(|row| row.search_identity()).collect();
        let mut removed = 0;
        for hit in indexed_records(index, &document_id)? {
            if !live_identities.contains(&hit.identity) {
                writer.delete_by_identity(&hit.identity)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn indexed_records(index: &RegisteredIndex, document_id: &str) -> Result<Vec<SearchHit>> {
    let searcher = index.backend().open_searcher(true)?;
    let total = searcher.number_of_documents()? as usize;
    searcher.search(&SearchQuery::new().field(field::DOCUMENT_ID, document_id), None, total)
}

fn delete_subtree(key: &SubtreeKey, index: &RegisteredIndex, writer: &mut dyn IndexWriter) -> Result<usize> {
    if !index.descriptor().covers_site(&key.site_name) {
        return Ok(0);
    }
    let searcher = index.backend().open_searcher(true)?;
    let total = searcher.number_of_documents()? as usize;
    if total == 0 {
        return Ok(0);
    }
    let query = SearchQuery::new().field(field::SITE_NAME, &key.site_name);
    let hits = searcher.search(&query, Some(&HitFilter::PathPrefix(key.alias_path.clone())), total)?;
    for hit in &hits {
        writer.delete_by_identity(&hit.identity)?;
    }
    Ok(hits.len())
}
