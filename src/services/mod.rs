use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::collections::Collection;

pub mod surreal;

pub type StoreResult<T> = Result<T, StoreError>;

/// Free-form document body: every field of a record except its identity and timestamps.
pub type FieldMap = Map<String, Value>;

/// Keys owned by the store. Callers can never write them through `create` or `patch`.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Upper bound appended to a prefix for range-style prefix queries.
pub const PREFIX_SENTINEL: char = '\u{f8ff}';

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("write rejected: {0}")]
    Rejected(String),
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl Record {
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn bool_field(&self, key: &str) -> bool {
        self.fields
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn sort_key(&self) -> (DateTime<Utc>, &str) {
        (self.created_at, self.id.as_str())
    }
}

/// Boundary between fetched and unfetched records: the `(createdAt, id)` of the
/// last record of the most recent page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageCursor {
    created_at: DateTime<Utc>,
    id: String,
}

impl PageCursor {
    pub fn after(record: &Record) -> Self {
        Self {
            created_at: record.created_at,
            id: record.id.clone(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn to_token(&self) -> String {
        format!(
            "{}|{}",
            self.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            self.id
        )
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let (stamp, id) = token.split_once('|')?;
        if id.is_empty() {
            return None;
        }
        let created_at = DateTime::parse_from_rfc3339(stamp)
            .ok()?
            .with_timezone(&Utc);
        Some(Self {
            created_at,
            id: id.to_string(),
        })
    }

    /// True when `record` sorts strictly after this cursor in descending creation order.
    pub fn precedes(&self, record: &Record) -> bool {
        record.sort_key() < (self.created_at, self.id.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: usize,
    pub after: Option<PageCursor>,
}

impl PageQuery {
    pub fn first(limit: usize) -> Self {
        Self { limit, after: None }
    }

    pub fn after(limit: usize, cursor: PageCursor) -> Self {
        Self {
            limit,
            after: Some(cursor),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixQuery {
    pub field: String,
    pub prefix: String,
    pub limit: usize,
}

impl PrefixQuery {
    pub fn upper_bound(&self) -> String {
        let mut bound = self.prefix.clone();
        bound.push(PREFIX_SENTINEL);
        bound
    }

    /// Half-open: `prefix <= value < prefix + U+F8FF`.
    pub fn matches(&self, value: &str) -> bool {
        value >= self.prefix.as_str() && value < self.upper_bound().as_str()
    }
}

/// Client handle for the external document database. One implementation talks to
/// SurrealDB, the other keeps everything in process for tests and demos.
#[async_trait]
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Records ordered by `createdAt` descending (id descending on ties), strictly after
    /// the cursor when one is given.
    async fn query_page(&self, collection: Collection, query: &PageQuery)
    -> StoreResult<Vec<Record>>;
    /// Records whose `field` lies in `[prefix, prefix + U+F8FF)`, ordered by that field.
    async fn query_prefix(
        &self,
        collection: Collection,
        query: &PrefixQuery,
    ) -> StoreResult<Vec<Record>>;
    async fn query_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Record>>;
    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>>;
    /// Stores a new record. The store assigns `id` and `createdAt`.
    async fn create(&self, collection: Collection, fields: FieldMap) -> StoreResult<Record>;
    /// Merges `fields` into an existing record and stamps `updatedAt`. Keys absent from
    /// `fields` are left untouched.
    async fn patch(&self, collection: Collection, id: &str, fields: FieldMap)
    -> StoreResult<Record>;
    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()>;
    async fn count(&self, collection: Collection) -> StoreResult<u64>;
}

pub fn strip_reserved(fields: &mut FieldMap) {
    for key in RESERVED_FIELDS {
        fields.remove(key);
    }
}

pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
}

#[derive(Default)]
struct InMemoryState {
    collections: HashMap<Collection, Vec<Record>>,
    next_id: u64,
    last_stamp: Option<DateTime<Utc>>,
}

impl InMemoryState {
    /// Strictly increasing timestamps so insertion order is also creation order.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_stamp {
            if now <= last {
                now = last + Duration::nanoseconds(1);
            }
        }
        self.last_stamp = Some(now);
        now
    }

    fn next_id(&mut self, collection: Collection) -> String {
        self.next_id += 1;
        format!("{}-{:06}", collection.as_str(), self.next_id)
    }

    fn records(&self, collection: Collection) -> &[Record] {
        self.collections
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Default)]
struct CallCounters {
    reads: AtomicUsize,
    prefix_reads: AtomicUsize,
    writes: AtomicUsize,
}

/// In-process document store. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
    offline: Arc<AtomicBool>,
    counters: Arc<CallCounters>,
    latency: Option<std::time::Duration>,
    reply_delay: Option<std::time::Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before touching data.
    pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Page and equality reads take their snapshot immediately and answer after `delay`.
    pub fn with_reply_delay(mut self, delay: std::time::Duration) -> Self {
        self.reply_delay = Some(delay);
        self
    }

    /// While offline every call fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn read_count(&self) -> usize {
        self.counters.reads.load(Ordering::SeqCst)
    }

    pub fn prefix_query_count(&self) -> usize {
        self.counters.prefix_reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.counters.writes.load(Ordering::SeqCst)
    }

    /// Inserts a record directly, bypassing latency, counters and the offline switch.
    pub fn seed(&self, collection: Collection, fields: Value) -> Record {
        let mut state = self.lock();
        let created_at = state.next_stamp();
        Self::insert(&mut state, collection, fields, created_at)
    }

    /// Like [`seed`](Self::seed) with an explicit creation time.
    pub fn seed_at(
        &self,
        collection: Collection,
        fields: Value,
        created_at: DateTime<Utc>,
    ) -> Record {
        let mut state = self.lock();
        Self::insert(&mut state, collection, fields, created_at)
    }

    pub fn snapshot(&self, collection: Collection) -> Vec<Record> {
        let mut records = self.lock().records(collection).to_vec();
        sort_newest_first(&mut records);
        records
    }

    pub fn new_with_sample() -> Self {
        let store = Self::new();
        for (name, role) in [
            ("Prabhas", "Actor"),
            ("Priyanka Chopra", "Actress"),
            ("Prashanth Neel", "Director"),
            ("Rajinikanth", "Actor"),
            ("Samantha Ruth Prabhu", "Actress"),
        ] {
            store.seed(
                Collection::Celebrities,
                json!({ "name": name, "role": role, "description": "", "imageUrl": "" }),
            );
        }
        for (name, industry) in [
            ("Kalki 2898 AD", "Tollywood"),
            ("Pushpa 2", "Tollywood"),
            ("Coolie", "Kollywood"),
            ("War 2", "Bollywood"),
        ] {
            store.seed(
                Collection::Movies,
                json!({
                    "name": name,
                    "genre": "Action",
                    "industry": industry,
                    "releaseDate": "2025-01-10T00:00:00Z",
                    "isTopBoxOffice": false,
                    "ottPlatforms": [],
                    "cast": []
                }),
            );
        }
        store.seed(
            Collection::News,
            json!({
                "title": "Box office opens big this weekend",
                "author": "Desk",
                "content": "Opening weekend collections crossed every estimate.",
                "category": "Tollywood",
                "isPromotion": false,
                "isWeeklyMagazine": true
            }),
        );
        store.seed(
            Collection::Users,
            json!({ "email": "editor@movie-reporter.local", "role": "admin", "isBlocked": false }),
        );
        store
    }

    fn insert(
        state: &mut InMemoryState,
        collection: Collection,
        fields: Value,
        created_at: DateTime<Utc>,
    ) -> Record {
        let mut fields = match fields {
            Value::Object(map) => map,
            _ => FieldMap::new(),
        };
        strip_reserved(&mut fields);
        let record = Record {
            id: state.next_id(collection),
            created_at,
            updated_at: None,
            fields,
        };
        state
            .collections
            .entry(collection)
            .or_default()
            .push(record.clone());
        record
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self) -> StoreResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".into()));
        }
        Ok(())
    }

    async fn reply<T>(&self, value: T) -> StoreResult<T> {
        if let Some(delay) = self.reply_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(value)
    }

    async fn enter_read(&self) -> StoreResult<()> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        self.enter().await
    }

    async fn enter_write(&self) -> StoreResult<()> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        self.enter().await
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn query_page(
        &self,
        collection: Collection,
        query: &PageQuery,
    ) -> StoreResult<Vec<Record>> {
        self.enter_read().await?;
        let records = {
            let state = self.lock();
            let mut records: Vec<Record> = state
                .records(collection)
                .iter()
                .filter(|record| {
                    query
                        .after
                        .as_ref()
                        .map_or(true, |cursor| cursor.precedes(record))
                })
                .cloned()
                .collect();
            sort_newest_first(&mut records);
            records.truncate(query.limit);
            records
        };
        self.reply(records).await
    }

    async fn query_prefix(
        &self,
        collection: Collection,
        query: &PrefixQuery,
    ) -> StoreResult<Vec<Record>> {
        self.counters.prefix_reads.fetch_add(1, Ordering::SeqCst);
        self.enter_read().await?;
        let state = self.lock();
        let mut matches: Vec<(String, Record)> = state
            .records(collection)
            .iter()
            .filter_map(|record| {
                let value = record.str_field(&query.field)?;
                query
                    .matches(value)
                    .then(|| (value.to_string(), record.clone()))
            })
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(matches
            .into_iter()
            .take(query.limit)
            .map(|(_, record)| record)
            .collect())
    }

    async fn query_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Record>> {
        self.enter_read().await?;
        let records = {
            let state = self.lock();
            let mut records: Vec<Record> = state
                .records(collection)
                .iter()
                .filter(|record| record.field(field) == Some(value))
                .cloned()
                .collect();
            sort_newest_first(&mut records);
            records
        };
        self.reply(records).await
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
        self.enter_read().await?;
        let state = self.lock();
        Ok(state
            .records(collection)
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    async fn create(&self, collection: Collection, fields: FieldMap) -> StoreResult<Record> {
        self.enter_write().await?;
        let mut state = self.lock();
        let created_at = state.next_stamp();
        Ok(Self::insert(
            &mut state,
            collection,
            Value::Object(fields),
            created_at,
        ))
    }

    async fn patch(
        &self,
        collection: Collection,
        id: &str,
        mut fields: FieldMap,
    ) -> StoreResult<Record> {
        self.enter_write().await?;
        strip_reserved(&mut fields);
        let mut state = self.lock();
        let stamp = state.next_stamp();
        let record = state
            .collections
            .get_mut(&collection)
            .and_then(|records| records.iter_mut().find(|record| record.id == id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.as_str().into(),
                id: id.into(),
            })?;
        record.fields.extend(fields);
        record.updated_at = Some(stamp);
        Ok(record.clone())
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        self.enter_write().await?;
        let mut state = self.lock();
        if let Some(records) = state.collections.get_mut(&collection) {
            records.retain(|record| record.id != id);
        }
        Ok(())
    }

    async fn count(&self, collection: Collection) -> StoreResult<u64> {
        self.enter_read().await?;
        Ok(self.lock().records(collection).len() as u64)
    }
}
