mod common;

use std::collections::BTreeMap;

use common::{alias, ram_registry, row, site_index};
use sitesearch_core::memory::MemoryContentStore;
use sitesearch_core::traits::AllowAll;
use sitesearch_core::types::{field, RequestContext, SearchHit, SearchQuery};
use sitesearch_core::Error;
use sitesearch_engine::{HydrationOptions, Hydrator, Indexer, ResultPermissionFilter, SiteSearch};

#[test]
fn hydration_issues_one_query_per_class() -> anyhow::Result<()> {
    let mut rows = Vec::new();
    for (offset, class) in ["cms.article", "cms.news", "cms.product"].iter().enumerate() {
        for i in 1..=50 {
            let id = offset as i64 * 100 + i;
            rows.push(row(id, id * 10, class, &format!("/{}/{}", class, i)));
        }
    }
    let store = MemoryContentStore::with_rows(rows);
    let (registry, index) = ram_registry(site_index("pages"));
    Indexer::new(&store).rebuild(&registry, "pages")?;

    let hits = index.searcher()?.search(&SearchQuery::new(), None, 500)?;
    assert_eq!(hits.len(), 150);

    let hydrated = Hydrator::new(&store).hydrate(&hits)?;
    assert_eq!(store.row_queries(), 3);
    assert_eq!(hydrated.len(), 150);
    for hit in &hits {
        let found = &hydrated[&hit.identity];
        assert_eq!(Some(found.document_id), hit.document_id());
        assert_eq!(Some(found.node_id), hit.node_id());
    }
    Ok(())
}

#[test]
fn linked_aliases_hydrate_to_their_own_rows() -> anyhow::Result<()> {
    let store = MemoryContentStore::with_rows(vec![
        row(1, 10, "cms.article", "/a"),
        alias(1, 7, 10, "cms.article", "/mirror/a"),
    ]);
    let (registry, index) = ram_registry(site_index("pages"));
    Indexer::new(&store).rebuild(&registry, "pages")?;

    let hits = index.searcher()?.search(&SearchQuery::new(), None, 10)?;
    let hydrated = Hydrator::new(&store).hydrate(&hits)?;
    assert_eq!(store.row_queries(), 1);
    assert_eq!(hydrated["1;10"].alias_path, "/a");
    assert_eq!(hydrated["1;7"].alias_path, "/mirror/a");
    assert_eq!(hydrated["1;7"].linked_node_id, Some(10));
    Ok(())
}

#[test]
fn stale_hits_are_dropped_and_order_is_kept() -> anyhow::Result<()> {
    let store = MemoryContentStore::with_rows(vec![
        row(1, 10, "cms.article", "/a"),
        row(2, 20, "cms.news", "/b"),
        row(3, 30, "cms.article", "/c"),
    ]);
    let (registry, index) = ram_registry(site_index("pages"));
    Indexer::new(&store).rebuild(&registry, "pages")?;
    let hits = index.searcher()?.search(&SearchQuery::new(), None, 10)?;
    let expected: Vec<String> = hits.iter().map(|h| h.identity.clone()).filter(|id| id != "2;20").collect();

    store.remove_document(2);
    let results = Hydrator::new(&store).hydrate_results(&hits)?;
    let order: Vec<String> = results.iter().map(|r| r.identity.clone()).collect();
    assert_eq!(order, expected);
    Ok(())
}

#[test]
fn incomplete_snapshots_are_skipped() -> anyhow::Result<()> {
    let store = MemoryContentStore::with_rows(vec![row(1, 10, "cms.article", "/a")]);
    let mut fields = BTreeMap::new();
    fields.insert(field::DOCUMENT_ID.to_string(), "1".to_string());
    let broken = SearchHit { identity: "1;10".to_string(), fields, score: 1.0, position: 0 };

    assert!(Hydrator::new(&store).hydrate(&[broken])?.is_empty());
    assert_eq!(store.row_queries(), 0);
    Ok(())
}

#[test]
fn results_carry_excerpt_and_preview_image() -> anyhow::Result<()> {
    let mut article = row(1, 10, "cms.article", "/a");
    article.columns.insert("Teaser".to_string(), "/media/a.png".to_string());
    article.columns.insert("Body".to_string(), "Pumps, valves and fittings".to_string());
    let store = MemoryContentStore::with_rows(vec![article]);
    let mut descriptor = site_index("pages");
    descriptor.content_columns = vec!["body".to_string()];
    let (registry, _) = ram_registry(descriptor);
    Indexer::new(&store).rebuild(&registry, "pages")?;

    let options = HydrationOptions { excerpt_length: 10, preview_image_column: Some("teaser".to_string()) };
    let search = SiteSearch::new(&store, &AllowAll).with_options(options);
    let mut ctx = RequestContext::new("visitor");
    let results = search.search(&registry, "pages", &SearchQuery::new().text("valves"), &mut ctx, 10)?;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].excerpt.as_deref(), Some("Document 1"));
    assert_eq!(results[0].preview_image.as_deref(), Some("/media/a.png"));
    assert!(results[0].score > 0.0);
    Ok(())
}

#[test]
fn permission_filter_records_only_allowed_hits() -> anyhow::Result<()> {
    let store = MemoryContentStore::with_rows(vec![
        row(1, 10, "cms.article", "/a"),
        row(2, 20, "cms.memberonly", "/members/b"),
        row(3, 30, "cms.article", "/c"),
    ]);
    let (registry, _) = ram_registry(site_index("pages"));
    Indexer::new(&store).rebuild(&registry, "pages")?;

    let oracle = |ctx: &RequestContext, hit: &SearchHit| hit.class_name() != Some("cms.memberonly") || ctx.has_role("member");

    let mut anonymous = RequestContext::new("anonymous");
    let results = SiteSearch::new(&store, &oracle).search(&registry, "pages", &SearchQuery::new(), &mut anonymous, 10)?;
    assert_eq!(results.len(), 2);
    let mut seen = anonymous.matched_identities();
    seen.sort();
    assert_eq!(seen, vec!["1;10", "3;30"]);
    assert!(anonymous.matched().iter().all(|m| m.position < 3));

    let mut member = RequestContext::new("jo").with_role("Member");
    let results = SiteSearch::new(&store, &oracle).search(&registry, "pages", &SearchQuery::new(), &mut member, 10)?;
    assert_eq!(results.len(), 3);
    assert_eq!(member.matched().len(), 3);
    Ok(())
}

#[test]
fn filter_hit_reports_position() {
    let deny_all = |_: &RequestContext, _: &SearchHit| false;
    let hit = SearchHit { identity: "4;40".to_string(), fields: BTreeMap::new(), score: 0.5, position: 0 };

    let mut ctx = RequestContext::new("x");
    assert!(!ResultPermissionFilter::new(&deny_all).filter_hit(&mut ctx, &hit, 0));
    assert!(ctx.matched().is_empty());

    assert!(ResultPermissionFilter::new(&AllowAll).filter_hit(&mut ctx, &hit, 4));
    assert_eq!(ctx.matched()[0].identity, "4;40");
    assert_eq!(ctx.matched()[0].position, 4);
}

#[test]
fn search_rejects_unknown_index_and_fields() {
    let store = MemoryContentStore::new();
    let (registry, _) = ram_registry(site_index("pages"));
    let search = SiteSearch::new(&store, &AllowAll);
    let mut ctx = RequestContext::new("x");

    assert!(matches!(search.search(&registry, "nope", &SearchQuery::new(), &mut ctx, 5), Err(Error::NotFound(_))));
    let bad = SearchQuery::new().field(field::CONTENT, "x");
    assert!(matches!(search.search(&registry, "pages", &bad, &mut ctx, 5), Err(Error::UnknownField(_))));
}
