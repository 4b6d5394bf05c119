use tracing::debug;

use sitesearch_core::error::Result;
use sitesearch_core::traits::{ContentStore, PermissionOracle};
use sitesearch_core::types::{HydratedResult, RequestContext, SearchQuery};

use crate::hydrate::{HydrationOptions, Hydrator};
use crate::permissions::ResultPermissionFilter;
use crate::registry::IndexRegistry;

/// Query -> permission check -> hydration.
pub struct SiteSearch<'a> {
    store: &'a dyn ContentStore,
    oracle: &'a dyn PermissionOracle,
    options: HydrationOptions,
}

impl<'a> SiteSearch<'a> {
    pub fn new(store: &'a dyn ContentStore, oracle: &'a dyn PermissionOracle) -> Self {
        Self { store, oracle, options: HydrationOptions::default() }
    }

    pub fn with_options(mut self, options: HydrationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn search(
        &self,
        registry: &IndexRegistry,
        index_name: &str,
        query: &SearchQuery,
        ctx: &mut RequestContext,
        limit: usize,
    ) -> Result<Vec<HydratedResult>> {
        let index = registry.get(index_name)?;
        let hits = index.searcher()?.search(query, None, limit)?;
        let total = hits.len();
        let allowed = ResultPermissionFilter::new(self.oracle).filter_hits(ctx, hits);
        let results = Hydrator::with_options(self.store, self.options.clone()).hydrate_results(&allowed)?;
        debug!(index = %index_name, query = %query, hits = total, allowed = allowed.len(), results = results.len(), "site search");
        Ok(results)
    }
}
