use std::time::Instant;

use tracing::{debug, warn};

use crate::collections::Collection;
use crate::config::TypeaheadConfig;
use crate::content::Reference;
use crate::errors::{ContentError, ContentResult};
use crate::services::{DocumentStore, PrefixQuery};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PickerState {
    #[default]
    Idle,
    Searching {
        query: String,
    },
    Suggesting {
        query: String,
        candidates: Vec<Reference>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryOutcome {
    /// Same text as before; nothing happened.
    Unchanged,
    /// Too short to search; suggestions were cleared.
    BelowThreshold,
    /// Inside the cooldown; held until [`ReferencePicker::flush`]. Earlier suggestions
    /// are withdrawn meanwhile.
    Deferred,
    Suggested(usize),
}

/// Prefix search over one collection's name field, producing [`Reference`] snapshots to
/// embed in the record under edit. Owned by a single form and driven one keystroke at a
/// time, so a result always belongs to the text that produced it.
pub struct ReferencePicker<S: DocumentStore> {
    store: S,
    collection: Collection,
    name_field: &'static str,
    config: TypeaheadConfig,
    query: String,
    state: PickerState,
    pending: Option<String>,
    last_issued: Option<Instant>,
}

impl<S: DocumentStore> ReferencePicker<S> {
    pub fn new(store: S, collection: Collection) -> Self {
        Self::with_config(store, collection, TypeaheadConfig::default())
    }

    pub fn with_config(store: S, collection: Collection, config: TypeaheadConfig) -> Self {
        Self {
            store,
            collection,
            name_field: collection.schema().title_field,
            config,
            query: String::new(),
            state: PickerState::Idle,
            pending: None,
            last_issued: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn state(&self) -> &PickerState {
        &self.state
    }

    pub fn candidates(&self) -> &[Reference] {
        match &self.state {
            PickerState::Suggesting { candidates, .. } => candidates,
            _ => &[],
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Feeds the current text of the search box.
    pub async fn set_query(&mut self, query: impl Into<String>) -> ContentResult<QueryOutcome> {
        let query = query.into();
        if query == self.query {
            return Ok(QueryOutcome::Unchanged);
        }
        self.query = query.clone();
        if query.chars().count() < self.config.min_chars {
            self.pending = None;
            self.state = PickerState::Idle;
            return Ok(QueryOutcome::BelowThreshold);
        }
        if self.cooldown_remaining().is_some() {
            debug!(collection = %self.collection, "typeahead query deferred");
            self.state = PickerState::Searching {
                query: query.clone(),
            };
            self.pending = Some(query);
            return Ok(QueryOutcome::Deferred);
        }
        self.pending = None;
        self.search(query).await
    }

    /// Issues the deferred query, if any, once the cooldown has run out.
    pub async fn flush(&mut self) -> ContentResult<Option<QueryOutcome>> {
        let Some(query) = self.pending.take() else {
            return Ok(None);
        };
        if let Some(remaining) = self.cooldown_remaining() {
            tokio::time::sleep(remaining).await;
        }
        self.search(query).await.map(Some)
    }

    /// Picks a candidate, clears the box and returns to idle.
    pub fn select(&mut self, id: &str) -> Option<Reference> {
        let reference = self
            .candidates()
            .iter()
            .find(|candidate| candidate.id == id)
            .cloned()?;
        self.clear();
        Some(reference)
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.pending = None;
        self.state = PickerState::Idle;
    }

    fn cooldown_remaining(&self) -> Option<std::time::Duration> {
        let elapsed = self.last_issued?.elapsed();
        self.config
            .cooldown
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())
    }

    async fn search(&mut self, query: String) -> ContentResult<QueryOutcome> {
        self.state = PickerState::Searching {
            query: query.clone(),
        };
        self.last_issued = Some(Instant::now());
        let prefix = PrefixQuery {
            field: self.name_field.to_string(),
            prefix: query.clone(),
            limit: self.config.limit,
        };
        match self.store.query_prefix(self.collection, &prefix).await {
            Ok(records) => {
                let candidates: Vec<Reference> = records
                    .iter()
                    .filter_map(|record| Reference::snapshot(record, self.name_field))
                    .collect();
                let count = candidates.len();
                self.state = PickerState::Suggesting { query, candidates };
                Ok(QueryOutcome::Suggested(count))
            }
            Err(source) => {
                self.state = PickerState::Idle;
                let err = ContentError::fetch(self.collection)(source);
                warn!(collection = %self.collection, error = %err, "typeahead search failed");
                Err(err)
            }
        }
    }
}
