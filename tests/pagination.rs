use std::collections::HashSet;
use std::time::Duration;

use movie_reporter::collections::Collection;
use movie_reporter::controller::{
    CollectionController, FetchKind, FetchOutcome, FetchState, SkipReason,
};
use movie_reporter::errors::ContentError;
use movie_reporter::filter::filter_records;
use movie_reporter::services::InMemoryStore;
use serde_json::json;

fn store_with(count: usize) -> InMemoryStore {
    let store = InMemoryStore::new();
    for n in 0..count {
        store.seed(
            Collection::News,
            json!({ "title": format!("Story {n:02}"), "author": "Desk", "content": "..." }),
        );
    }
    store
}

fn ids(controller: &CollectionController<InMemoryStore>) -> Vec<String> {
    controller.records().into_iter().map(|r| r.id).collect()
}

#[tokio::test]
async fn twenty_five_records_load_in_three_pages() {
    let controller = CollectionController::new(store_with(25), Collection::News);

    controller.fetch_first_page().await.unwrap();
    assert_eq!(controller.len(), 10);
    assert!(controller.has_more());

    controller.fetch_next_page().await.unwrap();
    assert_eq!(controller.len(), 20);
    assert!(controller.has_more());

    controller.fetch_next_page().await.unwrap();
    assert_eq!(controller.len(), 25);
    assert!(!controller.has_more());
}

#[tokio::test]
async fn paging_walks_the_whole_collection_in_order() {
    for (total, page_size) in [(1, 10), (7, 3), (23, 5), (31, 10), (9, 2)] {
        let store = store_with(total);
        let controller =
            CollectionController::new(store.clone(), Collection::News).with_page_size(page_size);

        let mut pages = 0;
        controller.fetch_first_page().await.unwrap();
        pages += 1;
        while controller.has_more() {
            controller.fetch_next_page().await.unwrap();
            pages += 1;
        }

        assert_eq!(pages, total.div_ceil(page_size), "m={total} n={page_size}");
        let loaded = ids(&controller);
        let unique: HashSet<_> = loaded.iter().collect();
        assert_eq!(unique.len(), loaded.len());
        let expected: Vec<String> = store
            .snapshot(Collection::News)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(loaded, expected);
    }
}

#[tokio::test]
async fn exact_multiple_reports_one_empty_extra_page() {
    let controller =
        CollectionController::new(store_with(20), Collection::News).with_page_size(10);
    controller.fetch_first_page().await.unwrap();
    controller.fetch_next_page().await.unwrap();
    assert!(controller.has_more());

    match controller.fetch_next_page().await.unwrap() {
        FetchOutcome::Loaded(summary) => {
            assert_eq!(summary.fetched, 0);
            assert_eq!(summary.total, 20);
            assert!(!summary.has_more);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_next_page_requests_load_once() {
    let store = store_with(30).with_latency(Duration::from_millis(40));
    let slow = CollectionController::new(store, Collection::News);
    slow.fetch_first_page().await.unwrap();
    let (a, b) = tokio::join!(slow.fetch_next_page(), slow.fetch_next_page());

    let outcomes = [a.unwrap(), b.unwrap()];
    assert!(outcomes.contains(&FetchOutcome::Skipped(SkipReason::InFlight)));
    assert!(outcomes.iter().any(|o| matches!(o, FetchOutcome::Loaded(_))));
    assert_eq!(slow.len(), 20);
    let unique: HashSet<_> = ids(&slow).into_iter().collect();
    assert_eq!(unique.len(), 20);
}

#[tokio::test]
async fn first_page_supersedes_a_pending_next_page() {
    let store = store_with(30).with_latency(Duration::from_millis(40));
    let controller = CollectionController::new(store, Collection::News);
    controller.fetch_first_page().await.unwrap();

    let (next, first) = tokio::join!(controller.fetch_next_page(), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(controller.fetch_state(), FetchState::Pending(FetchKind::Next));
        controller.fetch_first_page().await
    });

    assert_eq!(next.unwrap(), FetchOutcome::Stale);
    assert!(matches!(first.unwrap(), FetchOutcome::Loaded(_)));
    assert_eq!(controller.len(), 10);
}

#[tokio::test]
async fn late_results_after_detach_are_dropped() {
    let store = store_with(12).with_latency(Duration::from_millis(30));
    let controller = CollectionController::new(store, Collection::News);
    let screen = controller.clone();

    let pending = tokio::spawn(async move { controller.fetch_first_page().await });
    tokio::time::sleep(Duration::from_millis(5)).await;
    screen.detach();

    assert_eq!(pending.await.unwrap().unwrap(), FetchOutcome::Stale);
    assert!(screen.is_empty());
    assert_eq!(screen.fetch_state(), FetchState::Idle);
}

#[tokio::test]
async fn failed_fetch_keeps_the_cache_and_can_be_retried() {
    let store = store_with(15);
    let controller = CollectionController::new(store.clone(), Collection::News);
    controller.fetch_first_page().await.unwrap();
    let before = ids(&controller);

    store.set_offline(true);
    let err = controller.fetch_next_page().await.unwrap_err();
    assert!(matches!(err, ContentError::Fetch { .. }));
    assert_eq!(ids(&controller), before);
    assert!(controller.notifier().last().is_some());

    store.set_offline(false);
    controller.fetch_next_page().await.unwrap();
    assert_eq!(controller.len(), 15);
}

#[tokio::test]
async fn local_filter_is_idempotent() {
    let controller = CollectionController::new(store_with(10), Collection::News);
    controller.fetch_first_page().await.unwrap();
    controller.set_filter("story 0");

    let once = controller.visible();
    let twice = filter_records(&once, "story 0", Collection::News.schema().search_fields);
    assert_eq!(once, twice);
    assert_eq!(once.len(), 10);
}
