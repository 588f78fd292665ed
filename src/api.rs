use axum::{
    Json, Router,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::admin::{CollectionCount, overview};
use crate::auth::{AdminClaims, JwtSecret};
use crate::collections::Collection;
use crate::config::{AppConfig, TypeaheadConfig};
use crate::content::Reference;
use crate::errors::{ContentError, ContentResult};
use crate::filter::filter_records;
use crate::logging::{AuditAction, audit_by};
use crate::publishing::published;
use crate::services::{DocumentStore, FieldMap, PageCursor, PageQuery, Record};
use crate::typeahead::ReferencePicker;

const MAX_LIMIT: usize = 100;

#[derive(Clone)]
pub struct ApiState<S: DocumentStore> {
    pub store: S,
    pub page_size: usize,
    pub typeahead: TypeaheadConfig,
    pub jwt: JwtSecret,
}

impl<S: DocumentStore> ApiState<S> {
    pub fn new(store: S, config: &AppConfig) -> Self {
        Self {
            store,
            page_size: config.page_size,
            typeahead: config.typeahead,
            jwt: JwtSecret(config.jwt_secret.clone()),
        }
    }
}

impl<S: DocumentStore> FromRef<ApiState<S>> for JwtSecret {
    fn from_ref(state: &ApiState<S>) -> Self {
        state.jwt.clone()
    }
}

pub fn router<S: DocumentStore>(state: ApiState<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/public/:collection", get(public_list::<S>))
        .route("/api/admin/overview", get(admin_overview::<S>))
        .route(
            "/api/admin/:collection",
            get(admin_list::<S>).post(admin_create::<S>),
        )
        .route("/api/admin/:collection/suggest", get(admin_suggest::<S>))
        .route(
            "/api/admin/:collection/:id",
            axum::routing::patch(admin_update::<S>).delete(admin_delete::<S>),
        )
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub records: Vec<Record>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

async fn health() -> impl IntoResponse {
    Json(json!({ "service": "ok", "timestamp": Utc::now() }))
}

async fn public_list<S: DocumentStore>(
    State(state): State<ApiState<S>>,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
) -> ContentResult<Json<PageResponse>> {
    let collection: Collection = collection.parse()?;
    if !collection.is_public() {
        return Err(ContentError::UnknownCollection(collection.to_string()));
    }
    let mut page = load_page(&state, collection, &params).await?;
    page.records = published(page.records, Utc::now());
    Ok(Json(page))
}

async fn admin_list<S: DocumentStore>(
    State(state): State<ApiState<S>>,
    _admin: AdminClaims,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
) -> ContentResult<Json<PageResponse>> {
    let collection: Collection = collection.parse()?;
    let mut page = load_page(&state, collection, &params).await?;
    if let Some(q) = params.q.as_deref() {
        page.records = filter_records(&page.records, q, collection.schema().search_fields);
    }
    Ok(Json(page))
}

async fn admin_create<S: DocumentStore>(
    State(state): State<ApiState<S>>,
    AdminClaims(claims): AdminClaims,
    Path(collection): Path<String>,
    Json(fields): Json<FieldMap>,
) -> ContentResult<impl IntoResponse> {
    let collection: Collection = collection.parse()?;
    let payload = collection.schema().prepare_create(fields)?;
    let record = state
        .store
        .create(collection, payload)
        .await
        .map_err(ContentError::persistence(collection))?;
    audit_by(AuditAction::Create, collection, &record.id, &claims.sub);
    Ok((StatusCode::CREATED, Json(record)))
}

async fn admin_update<S: DocumentStore>(
    State(state): State<ApiState<S>>,
    AdminClaims(claims): AdminClaims,
    Path((collection, id)): Path<(String, String)>,
    Json(fields): Json<FieldMap>,
) -> ContentResult<Json<Record>> {
    let collection: Collection = collection.parse()?;
    let payload = collection.schema().prepare_update(fields)?;
    let record = state
        .store
        .patch(collection, &id, payload)
        .await
        .map_err(ContentError::persistence(collection))?;
    audit_by(AuditAction::Update, collection, &id, &claims.sub);
    Ok(Json(record))
}

async fn admin_delete<S: DocumentStore>(
    State(state): State<ApiState<S>>,
    AdminClaims(claims): AdminClaims,
    Path((collection, id)): Path<(String, String)>,
) -> ContentResult<StatusCode> {
    let collection: Collection = collection.parse()?;
    state
        .store
        .delete(collection, &id)
        .await
        .map_err(ContentError::persistence(collection))?;
    audit_by(AuditAction::Delete, collection, &id, &claims.sub);
    Ok(StatusCode::NO_CONTENT)
}

async fn admin_suggest<S: DocumentStore>(
    State(state): State<ApiState<S>>,
    _admin: AdminClaims,
    Path(collection): Path<String>,
    Query(params): Query<SuggestParams>,
) -> ContentResult<Json<Vec<Reference>>> {
    let collection: Collection = collection.parse()?;
    // Each request is its own keystroke, so the cooldown does not apply here.
    let config = TypeaheadConfig {
        cooldown: std::time::Duration::ZERO,
        ..state.typeahead
    };
    let mut picker = ReferencePicker::with_config(state.store.clone(), collection, config);
    picker.set_query(params.q).await?;
    Ok(Json(picker.candidates().to_vec()))
}

async fn admin_overview<S: DocumentStore>(
    State(state): State<ApiState<S>>,
    _admin: AdminClaims,
) -> Json<Value> {
    let counts: Vec<CollectionCount> = overview(&state.store).await;
    Json(json!({ "counts": counts }))
}

async fn load_page<S: DocumentStore>(
    state: &ApiState<S>,
    collection: Collection,
    params: &ListParams,
) -> ContentResult<PageResponse> {
    let limit = params.limit.unwrap_or(state.page_size).clamp(1, MAX_LIMIT);
    let query = match params.cursor.as_deref().filter(|token| !token.is_empty()) {
        Some(token) => {
            let cursor = PageCursor::from_token(token)
                .ok_or_else(|| ContentError::Validation("invalid cursor".into()))?;
            PageQuery::after(limit, cursor)
        }
        None => PageQuery::first(limit),
    };
    let records = state
        .store
        .query_page(collection, &query)
        .await
        .map_err(ContentError::fetch(collection))?;
    let has_more = records.len() == limit;
    let next_cursor = records
        .last()
        .map(|record| PageCursor::after(record).to_token());
    Ok(PageResponse {
        records,
        next_cursor,
        has_more,
    })
}
