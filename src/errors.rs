use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::collections::Collection;
use crate::services::StoreError;

pub type ContentResult<T> = Result<T, ContentError>;

/// Failures surfaced to an editor. None of them is fatal: the screen stays usable and
/// the action can be retried by hand.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContentError {
    #[error("failed to fetch {collection}: {source}")]
    Fetch {
        collection: Collection,
        source: StoreError,
    },
    #[error("failed to save {collection}: {source}")]
    Persistence {
        collection: Collection,
        source: StoreError,
    },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{collection} record {id} is not loaded")]
    NotFound { collection: Collection, id: String },
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
}

impl ContentError {
    pub fn fetch(collection: Collection) -> impl FnOnce(StoreError) -> Self {
        move |source| ContentError::Fetch { collection, source }
    }

    pub fn persistence(collection: Collection) -> impl FnOnce(StoreError) -> Self {
        move |source| ContentError::Persistence { collection, source }
    }

    pub fn missing_field(field: &str) -> Self {
        ContentError::Validation(format!("{field} is required"))
    }

    /// Short text for a transient notification.
    pub fn user_message(&self) -> String {
        match self {
            ContentError::Fetch { collection, .. } => format!("Failed to fetch {collection}"),
            ContentError::Persistence { collection, .. } => {
                format!("Failed to save {}", collection.schema().label.to_lowercase())
            }
            ContentError::Validation(message) => message.clone(),
            ContentError::NotFound { .. } => "Record is no longer loaded".into(),
            ContentError::UnknownCollection(name) => format!("Unknown collection {name}"),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ContentError::Validation(_) => StatusCode::BAD_REQUEST,
            ContentError::NotFound { .. } | ContentError::UnknownCollection(_) => {
                StatusCode::NOT_FOUND
            }
            ContentError::Persistence {
                source: StoreError::NotFound { .. },
                ..
            } => StatusCode::NOT_FOUND,
            ContentError::Fetch { .. } | ContentError::Persistence { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for ContentError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({ "status": "error", "message": self.to_string() })),
        )
            .into_response()
    }
}
