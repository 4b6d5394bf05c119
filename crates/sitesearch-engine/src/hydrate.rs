//! Joins search hits back to live content rows with one batched store query
//! per class.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use sitesearch_core::config::EngineSettings;
use sitesearch_core::error::Result;
use sitesearch_core::traits::ContentStore;
use sitesearch_core::types::{field, hydration_key, ContentRow, HydratedResult, Identity, RowFilter, SearchHit};

/// The part of a hit's field snapshot needed to find its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitDescriptor {
    pub class_name: String,
    pub node_id: i64,
    pub document_id: i64,
    pub is_link: bool,
}

impl HitDescriptor {
    pub fn from_hit(hit: &SearchHit) -> Option<Self> {
        Some(Self {
            class_name: hit.class_name().filter(|c| !c.is_empty())?.to_ascii_lowercase(),
            node_id: hit.node_id()?,
            document_id: hit.document_id()?,
            is_link: hit.linked_node_id().is_some(),
        })
    }

    pub fn key(&self) -> String {
        hydration_key(self.document_id, self.node_id, &self.class_name)
    }
}

/// One filter covering every hit of a class.
pub fn build_row_filter<'h>(hits: impl IntoIterator<Item = &'h HitDescriptor>) -> RowFilter {
    let mut filter = RowFilter::default();
    for hit in hits {
        if hit.is_link {
            if !filter.linked.contains(&(hit.document_id, hit.node_id)) {
                filter.linked.push((hit.document_id, hit.node_id));
            }
        } else if !filter.document_ids.contains(&hit.document_id) {
            filter.document_ids.push(hit.document_id);
        }
    }
    filter
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrationOptions {
    /// Maximum excerpt length in characters.
    pub excerpt_length: usize,
    pub preview_image_column: Option<String>,
}

impl Default for HydrationOptions {
    fn default() -> Self {
        Self { excerpt_length: 200, preview_image_column: None }
    }
}

impl From<&EngineSettings> for HydrationOptions {
    fn from(settings: &EngineSettings) -> Self {
        Self { excerpt_length: settings.excerpt_length, preview_image_column: settings.preview_image_column.clone() }
    }
}

pub struct Hydrator<'a> {
    store: &'a dyn ContentStore,
    options: HydrationOptions,
}

impl<'a> Hydrator<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self::with_options(store, HydrationOptions::default())
    }

    pub fn with_options(store: &'a dyn ContentStore, options: HydrationOptions) -> Self {
        Self { store, options }
    }

    /// Rows keyed by hit identity. Hits whose row is gone are absent.
    pub fn hydrate(&self, hits: &[SearchHit]) -> Result<HashMap<Identity, ContentRow>> {
        let mut by_class: BTreeMap<String, Vec<(&SearchHit, HitDescriptor)>> = BTreeMap::new();
        for hit in hits {
            match HitDescriptor::from_hit(hit) {
                Some(descriptor) => by_class.entry(descriptor.class_name.clone()).or_default().push((hit, descriptor)),
                None => warn!(identity = %hit.identity, "hit has an incomplete field snapshot; skipped"),
            }
        }

        let mut rows = HashMap::new();
        for (class_name, group) in by_class {
            let filter = build_row_filter(group.iter().map(|(_, d)| d));
            let mut keyed: HashMap<String, ContentRow> =
                self.store.select_rows(&class_name, &filter)?.into_iter().map(|row| (row.hydration_key(), row)).collect();
            debug!(class = %class_name, hits = group.len(), rows = keyed.len(), "hydrated class");
            for (hit, descriptor) in group {
                if let Some(row) = keyed.remove(&descriptor.key()) {
                    rows.insert(hit.identity.clone(), row);
                }
            }
        }
        Ok(rows)
    }

    /// Hydrated results in hit order; stale hits are dropped.
    pub fn hydrate_results(&self, hits: &[SearchHit]) -> Result<Vec<HydratedResult>> {
        let mut rows = self.hydrate(hits)?;
        Ok(hits
            .iter()
            .filter_map(|hit| {
                let row = rows.remove(&hit.identity)?;
                Some(HydratedResult {
                    identity: hit.identity.clone(),
                    preview_image: self.preview_image(&row),
                    excerpt: self.excerpt(hit),
                    score: hit.score,
                    row,
                })
            })
            .collect())
    }

    fn preview_image(&self, row: &ContentRow) -> Option<String> {
        let column = self.options.preview_image_column.as_deref()?;
        row.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value.clone())
            .filter(|value| !value.trim().is_empty())
    }

    fn excerpt(&self, hit: &SearchHit) -> Option<String> {
        let content = hit.field(field::CONTENT)?.trim();
        if content.is_empty() {
            return None;
        }
        Some(content.chars().take(self.options.excerpt_length).collect())
    }
}
