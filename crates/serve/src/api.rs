//! Route table for the ItemSearch HTTP API

use crate::handlers::{self, AppState};
use crate::middleware::require_api_token;
use axum::{
    middleware,
    routing::{get, put},
    Router,
};

/// API version
pub const API_VERSION: &str = "v1";

/// All routes with state attached.
///
/// `/api/status` is open; everything under `/api/v1` passes the token guard
/// first.
pub fn create_routes(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/items", put(handlers::put_item))
        .route(
            "/items/:id",
            get(handlers::get_item).delete(handlers::delete_item),
        )
        .route(
            "/search",
            get(handlers::search_get).post(handlers::search_post),
        )
        .route(
            "/suggestions",
            get(handlers::suggestions_get).post(handlers::suggestions_post),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_token,
        ));

    Router::new()
        .route("/api/status", get(handlers::status))
        .nest(&format!("/api/{}", API_VERSION), v1)
        .with_state(state)
}
