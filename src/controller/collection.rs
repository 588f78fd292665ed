use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use crate::collections::{Collection, CollectionSchema};
use crate::controller::form::EditForm;
use crate::errors::{ContentError, ContentResult};
use crate::filter::filter_records;
use crate::notify::Notifier;
use crate::services::{DocumentStore, PageCursor, PageQuery, Record, StoreError};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchKind {
    First,
    Next,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSummary {
    /// Records returned by the store for this page.
    pub fetched: usize,
    /// Cache size after the page was applied.
    pub total: usize,
    pub has_more: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum FetchState {
    #[default]
    Idle,
    Pending(FetchKind),
    Succeeded(PageSummary),
    Failed(ContentError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    InFlight,
    NoCursor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(PageSummary),
    Skipped(SkipReason),
    /// The result arrived after the controller was detached or superseded and was dropped.
    Stale,
}

#[derive(Default)]
pub(super) struct ControllerState {
    pub(super) records: Vec<Record>,
    pub(super) cursor: Option<PageCursor>,
    pub(super) has_more: bool,
    pub(super) fetch: FetchState,
    pub(super) generation: u64,
    pub(super) filter: String,
    pub(super) form: EditForm,
}

/// Page cache, local filter and mutation dispatcher for one collection on one screen.
///
/// Records are kept newest first and never contain two entries with the same id. The
/// cache only grows through `fetch_next_page`; it shrinks by one on a confirmed delete and
/// is replaced wholesale by `fetch_first_page`, which every create and update triggers.
///
/// Clones share state, so a handle can be moved into a spawned task while the screen keeps
/// another. The lock is never held across a store call.
pub struct CollectionController<S: DocumentStore> {
    pub(super) store: S,
    pub(super) schema: &'static CollectionSchema,
    pub(super) page_size: usize,
    pub(super) notifier: Notifier,
    pub(super) scope: Option<(&'static str, Value)>,
    pub(super) state: Arc<Mutex<ControllerState>>,
}

impl<S: DocumentStore> Clone for CollectionController<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            schema: self.schema,
            page_size: self.page_size,
            notifier: self.notifier.clone(),
            scope: self.scope.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: DocumentStore> CollectionController<S> {
    pub fn new(store: S, collection: Collection) -> Self {
        Self {
            store,
            schema: collection.schema(),
            page_size: DEFAULT_PAGE_SIZE,
            notifier: Notifier::new(),
            scope: None,
            state: Arc::new(Mutex::new(ControllerState::default())),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = notifier;
        self
    }

    /// Restricts the list to records whose `field` equals `value`. A scoped list is loaded
    /// whole by `fetch_first_page` and never has a next page.
    pub fn with_scope(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.scope = Some((field, value.into()));
        self
    }

    pub fn collection(&self) -> Collection {
        self.schema.collection
    }

    pub fn schema(&self) -> &'static CollectionSchema {
        self.schema
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replaces the cache with the newest page. A first-page fetch already in flight makes
    /// this a no-op; a next-page fetch in flight is superseded and its result dropped.
    pub async fn fetch_first_page(&self) -> ContentResult<FetchOutcome> {
        self.load_first_page(false).await
    }

    /// First page for a write that just went through. Supersedes any fetch in flight, since
    /// that fetch may have read the store before the write landed.
    pub(super) async fn reload_first_page(&self) -> ContentResult<FetchOutcome> {
        self.load_first_page(true).await
    }

    async fn load_first_page(&self, supersede: bool) -> ContentResult<FetchOutcome> {
        let generation = {
            let mut state = self.lock();
            let in_flight = match state.fetch {
                FetchState::Pending(kind) => Some(kind),
                _ => None,
            };
            match in_flight {
                Some(FetchKind::First) if !supersede => {
                    return Ok(FetchOutcome::Skipped(SkipReason::InFlight));
                }
                Some(_) => state.generation += 1,
                None => {}
            }
            state.fetch = FetchState::Pending(FetchKind::First);
            state.generation
        };

        let result = match &self.scope {
            Some((field, value)) => {
                self.store
                    .query_eq(self.collection(), field, value)
                    .await
            }
            None => {
                self.store
                    .query_page(self.collection(), &PageQuery::first(self.page_size))
                    .await
            }
        };

        let mut state = self.lock();
        if state.generation != generation {
            debug!(collection = %self.collection(), "dropping stale first page");
            return Ok(FetchOutcome::Stale);
        }
        match result {
            Ok(records) => {
                let fetched = records.len();
                state.cursor = match self.scope {
                    Some(_) => None,
                    None => records.last().map(PageCursor::after),
                };
                state.records = Vec::with_capacity(fetched);
                push_unique(&mut state.records, records);
                Ok(self.finish_page(&mut state, fetched))
            }
            Err(source) => Err(self.fail_fetch(&mut state, source)),
        }
    }

    /// Appends the page after the current cursor. Skipped while any fetch is pending or
    /// before a first page has produced a cursor.
    pub async fn fetch_next_page(&self) -> ContentResult<FetchOutcome> {
        let (generation, cursor) = {
            let mut state = self.lock();
            if matches!(state.fetch, FetchState::Pending(_)) {
                return Ok(FetchOutcome::Skipped(SkipReason::InFlight));
            }
            let Some(cursor) = state.cursor.clone() else {
                return Ok(FetchOutcome::Skipped(SkipReason::NoCursor));
            };
            state.fetch = FetchState::Pending(FetchKind::Next);
            (state.generation, cursor)
        };

        let result = self
            .store
            .query_page(self.collection(), &PageQuery::after(self.page_size, cursor))
            .await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(collection = %self.collection(), "dropping stale next page");
            return Ok(FetchOutcome::Stale);
        }
        match result {
            Ok(records) => {
                let fetched = records.len();
                if let Some(last) = records.last() {
                    state.cursor = Some(PageCursor::after(last));
                }
                push_unique(&mut state.records, records);
                Ok(self.finish_page(&mut state, fetched))
            }
            Err(source) => Err(self.fail_fetch(&mut state, source)),
        }
    }

    /// Unbinds the controller from its screen. Fetches still in flight finish against the
    /// store but their results are dropped.
    pub fn detach(&self) {
        let mut state = self.lock();
        let generation = state.generation + 1;
        *state = ControllerState {
            generation,
            ..ControllerState::default()
        };
    }

    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    pub fn record(&self, id: &str) -> Option<Record> {
        self.lock()
            .records
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().records.iter().any(|record| record.id == id)
    }

    /// True when the last page came back full. A collection whose size is an exact
    /// multiple of the page size reports one extra, empty page.
    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        self.lock().cursor.clone()
    }

    pub fn fetch_state(&self) -> FetchState {
        self.lock().fetch.clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.lock().fetch, FetchState::Pending(_))
    }

    pub fn set_filter(&self, query: impl Into<String>) {
        self.lock().filter = query.into();
    }

    pub fn filter(&self) -> String {
        self.lock().filter.clone()
    }

    /// Cached records narrowed by the current filter text.
    pub fn visible(&self) -> Vec<Record> {
        let state = self.lock();
        filter_records(&state.records, &state.filter, self.schema.search_fields)
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish_page(&self, state: &mut ControllerState, fetched: usize) -> FetchOutcome {
        state.has_more = self.scope.is_none() && fetched == self.page_size;
        let summary = PageSummary {
            fetched,
            total: state.records.len(),
            has_more: state.has_more,
        };
        state.fetch = FetchState::Succeeded(summary);
        debug!(
            collection = %self.collection(),
            fetched,
            total = summary.total,
            has_more = summary.has_more,
            "page loaded"
        );
        FetchOutcome::Loaded(summary)
    }

    fn fail_fetch(&self, state: &mut ControllerState, source: StoreError) -> ContentError {
        let err = ContentError::fetch(self.collection())(source);
        warn!(collection = %self.collection(), error = %err, "fetch failed");
        state.fetch = FetchState::Failed(err.clone());
        self.notifier.error(err.user_message());
        err
    }
}

fn push_unique(cache: &mut Vec<Record>, page: Vec<Record>) {
    for record in page {
        if !cache.iter().any(|cached| cached.id == record.id) {
            cache.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryStore;
    use serde_json::json;

    fn seeded(count: usize) -> InMemoryStore {
        let store = InMemoryStore::new();
        for n in 0..count {
            store.seed(Collection::Blogs, json!({ "title": format!("Post {n}") }));
        }
        store
    }

    #[tokio::test]
    async fn next_page_needs_a_cursor() {
        let controller = CollectionController::new(seeded(3), Collection::Blogs);
        assert_eq!(
            controller.fetch_next_page().await.unwrap(),
            FetchOutcome::Skipped(SkipReason::NoCursor)
        );
    }

    #[tokio::test]
    async fn empty_page_keeps_the_cursor() {
        let controller =
            CollectionController::new(seeded(4), Collection::Blogs).with_page_size(2);
        controller.fetch_first_page().await.unwrap();
        controller.fetch_next_page().await.unwrap();
        assert!(controller.has_more());
        let cursor = controller.cursor();
        let outcome = controller.fetch_next_page().await.unwrap();
        assert_eq!(
            outcome,
            FetchOutcome::Loaded(PageSummary {
                fetched: 0,
                total: 4,
                has_more: false
            })
        );
        assert_eq!(controller.cursor(), cursor);
    }

    #[tokio::test]
    async fn filter_narrows_only_cached_records() {
        let store = seeded(5);
        let controller = CollectionController::new(store, Collection::Blogs).with_page_size(2);
        controller.fetch_first_page().await.unwrap();
        controller.set_filter("post 1");
        assert!(controller.visible().is_empty());
        controller.set_filter("POST 4");
        assert_eq!(controller.visible().len(), 1);
        controller.set_filter("");
        assert_eq!(controller.visible().len(), 2);
    }

    #[tokio::test]
    async fn scoped_list_loads_matches_in_one_page() {
        let store = InMemoryStore::new();
        for n in 0..4 {
            let industry = if n % 2 == 0 { "Tollywood" } else { "Bollywood" };
            store.seed(
                Collection::AwardCategories,
                json!({ "name": format!("Category {n}"), "industry": industry }),
            );
        }
        let controller = CollectionController::new(store, Collection::AwardCategories)
            .with_page_size(1)
            .with_scope("industry", "Tollywood");

        controller.fetch_first_page().await.unwrap();
        assert_eq!(controller.len(), 2);
        assert!(!controller.has_more());
        assert_eq!(
            controller.fetch_next_page().await.unwrap(),
            FetchOutcome::Skipped(SkipReason::NoCursor)
        );
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_and_recorded() {
        let store = seeded(2);
        let controller = CollectionController::new(store.clone(), Collection::Blogs);
        store.set_offline(true);
        let err = controller.fetch_first_page().await.unwrap_err();
        assert!(matches!(err, ContentError::Fetch { .. }));
        assert!(matches!(controller.fetch_state(), FetchState::Failed(_)));
        assert_eq!(
            controller.notifier().last().unwrap().message,
            "Failed to fetch blogs"
        );
    }
}
