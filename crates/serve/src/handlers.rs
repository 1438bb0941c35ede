//! HTTP handlers for ItemSearch serve crate

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use itemsearch_core::{
    ErrorCategory, IndexReceipt, Item, ItemSearchError, ItemStore, SearchEngine, SearchKind,
    SearchRequest, SearchResponse, SearchService, ServiceConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: ItemStore,
    pub search: SearchService,
    /// Expected API token; `None` rejects every guarded request
    pub api_token: Option<Arc<str>>,
}

impl AppState {
    /// Build state around an already constructed engine handle
    pub fn new(engine: Arc<dyn SearchEngine>, config: &ServiceConfig) -> Self {
        Self {
            store: ItemStore::new(engine.clone()),
            search: SearchService::new(engine, config.search.clone()),
            api_token: config.api_token.as_deref().map(Arc::from),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// An error ready to be rendered as a JSON response
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, error: S) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                detail: None,
            },
        }
    }

    pub fn with_detail<S: Into<String>>(mut self, detail: S) -> Self {
        self.body.detail = Some(detail.into());
        self
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
            .with_detail(ItemSearchError::Unauthorized.to_string())
    }

    /// Map a core error for an operation.
    ///
    /// `invalid` is the error text used for caller mistakes, `not_found` for
    /// missing resources and `failure` for everything the caller cannot fix.
    fn from_core(err: ItemSearchError, invalid: &str, not_found: &str, failure: &str) -> Self {
        match err.category() {
            ErrorCategory::Validation => {
                Self::new(StatusCode::BAD_REQUEST, invalid).with_detail(err.to_string())
            }
            ErrorCategory::Security => Self::unauthorized(),
            ErrorCategory::NotFound => Self::new(StatusCode::NOT_FOUND, not_found),
            _ => {
                error!(error = %err, operation = failure, "Request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, failure).with_detail(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

const INVALID_BODY: &str = "Invalid request body";
const INVALID_PARAMETERS: &str = "Invalid request parameters";

/// Liveness probe
pub async fn status() -> impl IntoResponse {
    Json(StatusResponse {
        status: "Search service is running".to_string(),
    })
}

/// Fetch one item
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    state.store.get(&id).await.map(Json).map_err(|e| {
        ApiError::from_core(e, INVALID_PARAMETERS, "Item not found", "Failed to retrieve item")
    })
}

/// Create or replace an item
pub async fn put_item(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<IndexResponse>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        ApiError::new(StatusCode::BAD_REQUEST, INVALID_BODY).with_detail(rejection.body_text())
    })?;

    let receipt = state
        .store
        .create_or_replace(body)
        .await
        .map_err(|e| ApiError::from_core(e, INVALID_BODY, "Item not found", "Failed to index item"))?;

    Ok(Json(IndexResponse::from(receipt)))
}

/// Delete an item
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.store.delete(&id).await.map_err(|e| {
        ApiError::from_core(e, INVALID_PARAMETERS, "can't find item", "Failed to delete item")
    })?;

    Ok(Json(DeleteResponse {
        message: "Item successfully deleted".to_string(),
        id,
    }))
}

pub async fn search_get(
    State(state): State<AppState>,
    params: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(request) = params.map_err(invalid_parameters)?;
    run_search(&state, SearchKind::Search, request).await
}

pub async fn search_post(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = body.map_err(invalid_parameters)?;
    run_search(&state, SearchKind::Search, request).await
}

pub async fn suggestions_get(
    State(state): State<AppState>,
    params: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(request) = params.map_err(invalid_parameters)?;
    run_search(&state, SearchKind::Suggestions, request).await
}

pub async fn suggestions_post(
    State(state): State<AppState>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = body.map_err(invalid_parameters)?;
    run_search(&state, SearchKind::Suggestions, request).await
}

async fn run_search(
    state: &AppState,
    kind: SearchKind,
    request: SearchRequest,
) -> Result<Json<SearchResponse>, ApiError> {
    let failure = match kind {
        SearchKind::Search => "Failed to search items",
        SearchKind::Suggestions => "Failed to retrieve suggestions",
    };

    state
        .search
        .run(kind, &request)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_core(e, INVALID_PARAMETERS, "Not found", failure))
}

fn invalid_parameters<R: std::fmt::Display>(rejection: R) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, INVALID_PARAMETERS).with_detail(rejection.to_string())
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Index response
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexResponse {
    pub message: String,
    pub id: String,
    pub index: String,
}

impl From<IndexReceipt> for IndexResponse {
    fn from(receipt: IndexReceipt) -> Self {
        Self {
            message: "Item successfully indexed".to_string(),
            id: receipt.id,
            index: receipt.index,
        }
    }
}

/// Delete response
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: String,
}
