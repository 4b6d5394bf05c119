use sitesearch_core::traits::PermissionOracle;
use sitesearch_core::types::{RequestContext, SearchHit};

/// Per-hit access check of the read path. Allowed hits are recorded in the
/// request context together with their position.
pub struct ResultPermissionFilter<'a> {
    oracle: &'a dyn PermissionOracle,
}

impl<'a> ResultPermissionFilter<'a> {
    pub fn new(oracle: &'a dyn PermissionOracle) -> Self {
        Self { oracle }
    }

    pub fn filter_hit(&self, ctx: &mut RequestContext, hit: &SearchHit, position: usize) -> bool {
        let allowed = self.oracle.is_allowed(ctx, hit);
        if allowed {
            ctx.record_match(&hit.identity, position);
        }
        allowed
    }

    pub fn filter_hits(&self, ctx: &mut RequestContext, hits: Vec<SearchHit>) -> Vec<SearchHit> {
        let mut allowed = Vec::with_capacity(hits.len());
        for (position, hit) in hits.into_iter().enumerate() {
            if self.filter_hit(ctx, &hit, position) {
                allowed.push(hit);
            }
        }
        allowed
    }
}
