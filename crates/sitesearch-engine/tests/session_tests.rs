mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{row, site_index, CountingBackend, FlakyStore, SITE};
use sitesearch_core::memory::MemoryContentStore;
use sitesearch_core::types::{IndexDescriptor, IndexStatus, MaintenanceTask};
use sitesearch_core::Error;
use sitesearch_engine::{with_writer, IndexRegistry, Indexer, RebuildOutcome, RegisteredIndex, TaskDispatcher};

fn counting_registry(descriptor: IndexDescriptor) -> (IndexRegistry, Arc<RegisteredIndex>, Arc<CountingBackend>) {
    let backend = Arc::new(CountingBackend::new(&descriptor.name));
    let mut registry = IndexRegistry::new();
    let index = registry.register(descriptor, backend.clone()).expect("register");
    (registry, index, backend)
}

#[test]
fn writer_is_closed_once_on_success() {
    let store = MemoryContentStore::with_rows(vec![row(1, 10, "cms.article", "/a")]);
    let (registry, _, backend) = counting_registry(site_index("pages"));

    Indexer::new(&store).rebuild(&registry, "pages").expect("rebuild");
    TaskDispatcher::new(&store)
        .process_task(&registry, &MaintenanceTask::document(1, None, "cms.article"))
        .expect("task");

    assert_eq!(backend.opened(), 2);
    assert_eq!(backend.closed(), 2);
}

#[test]
fn writer_is_closed_once_when_the_session_fails() {
    let (_, index, backend) = counting_registry(site_index("pages"));

    let err = with_writer(&index, false, |_writer| -> sitesearch_core::Result<()> {
        Err(Error::ContentStore("gone".to_string()))
    })
    .unwrap_err();
    assert!(matches!(err, Error::ContentStore(_)));

    backend.fail_flush.store(true, Ordering::SeqCst);
    assert!(with_writer(&index, true, |_writer| Ok(())).is_err());

    assert_eq!(backend.opened(), 2);
    assert_eq!(backend.closed(), 2);
}

#[test]
fn failed_streaming_marks_full_rebuild_as_errored() {
    let mut broken = row(2, 20, "cms.article", "/b");
    broken.class_name = String::new();
    let store = MemoryContentStore::with_rows(vec![row(1, 10, "cms.article", "/a"), broken]);
    let (registry, index, backend) = counting_registry(site_index("pages"));

    let err = Indexer::new(&store).rebuild(&registry, "pages").unwrap_err();
    assert!(matches!(err, Error::StreamingFailed { .. }));
    assert_eq!(index.status(), IndexStatus::Error);
    assert!(index.descriptor().last_updated.is_none());
    assert_eq!(backend.closed(), 1);
}

#[test]
fn store_failure_during_full_rebuild_marks_error() {
    let store = FlakyStore::with_rows(vec![row(1, 10, "cms.article", "/a")]);
    let (registry, index, _) = counting_registry(site_index("pages"));
    store.fail(true);

    assert!(matches!(Indexer::new(&store).rebuild(&registry, "pages"), Err(Error::ContentStore(_))));
    assert_eq!(index.status(), IndexStatus::Error);

    store.fail(false);
    assert_eq!(Indexer::new(&store).rebuild(&registry, "pages").expect("retry"), RebuildOutcome::Completed { documents: 1 });
    assert_eq!(index.status(), IndexStatus::Ready);
}

#[test]
fn panic_inside_full_session_leaves_error_and_releases_writer() {
    let (_, index, backend) = counting_registry(site_index("pages"));

    let result = catch_unwind(AssertUnwindSafe(|| {
        let _ = with_writer(&index, true, |_writer| -> sitesearch_core::Result<()> { panic!("serializer blew up") });
    }));
    assert!(result.is_err());
    assert_eq!(index.status(), IndexStatus::Error);
    assert_eq!(backend.closed(), 1);

    // the poisoned writer mutex is recovered
    with_writer(&index, false, |_writer| Ok(())).expect("next session");
}

#[test]
fn partial_failure_keeps_status_ready() {
    let store = FlakyStore::with_rows(vec![row(1, 10, "cms.article", "/a")]);
    let (registry, index, backend) = counting_registry(site_index("pages"));
    Indexer::new(&store).rebuild(&registry, "pages").expect("rebuild");

    backend.fail_flush.store(true, Ordering::SeqCst);
    let err = TaskDispatcher::new(&store)
        .process_task(&registry, &MaintenanceTask::partial_rebuild(SITE, "/a", "cms.document"))
        .unwrap_err();
    assert!(matches!(err, Error::StreamingFailed { .. }));
    assert_eq!(index.status(), IndexStatus::Ready);
}

#[test]
fn empty_configuration_skips_rebuild() {
    let store = MemoryContentStore::with_rows(vec![row(1, 10, "cms.article", "/a")]);
    let (registry, index, backend) = counting_registry(IndexDescriptor::new("bare"));

    assert_eq!(Indexer::new(&store).rebuild(&registry, "bare").expect("rebuild"), RebuildOutcome::Skipped);
    assert_eq!(index.status(), IndexStatus::Ready);
    assert_eq!(backend.opened(), 0);
}

#[test]
fn unknown_index_is_not_found() {
    let store = MemoryContentStore::new();
    let (registry, _, _) = counting_registry(site_index("pages"));
    assert!(matches!(Indexer::new(&store).rebuild(&registry, "missing"), Err(Error::NotFound(_))));
}

#[test]
fn rebuild_all_reports_each_index() {
    let store = MemoryContentStore::with_rows(vec![row(1, 10, "cms.article", "/a")]);
    let mut registry = IndexRegistry::new();
    registry.register(site_index("pages"), Arc::new(CountingBackend::new("pages"))).expect("register");
    registry.register(IndexDescriptor::new("bare"), Arc::new(CountingBackend::new("bare"))).expect("register");
    assert!(registry.register(site_index("PAGES"), Arc::new(CountingBackend::new("dup"))).is_err());

    let outcomes = Indexer::new(&store).rebuild_all(&registry);
    let summary: Vec<(String, RebuildOutcome)> =
        outcomes.into_iter().map(|(name, outcome)| (name, outcome.expect("outcome"))).collect();
    assert_eq!(
        summary,
        vec![
            ("bare".to_string(), RebuildOutcome::Skipped),
            ("pages".to_string(), RebuildOutcome::Completed { documents: 1 }),
        ]
    );
}

#[test]
fn cached_searcher_is_refreshed_after_writes() {
    let store = MemoryContentStore::with_rows(vec![row(1, 10, "cms.article", "/a")]);
    let (registry, index, _) = counting_registry(site_index("pages"));

    let before = index.searcher().expect("searcher");
    assert_eq!(before.number_of_documents().expect("count"), 0);
    assert!(Arc::ptr_eq(&before, &index.searcher().expect("cached")));

    Indexer::new(&store).rebuild(&registry, "pages").expect("rebuild");
    assert_eq!(index.searcher().expect("fresh").number_of_documents().expect("count"), 1);
    assert_eq!(before.number_of_documents().expect("count"), 0);
}
