use std::sync::Arc;

use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    server::AppState,
    transport::{middleware::add_response_headers, routes::status_routes},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(status_routes::landing))
        .route("/health", get(status_routes::health))
        .route("/status", get(status_routes::status))
        .route("/ping", get(status_routes::ping))
        .fallback(status_routes::not_found)
        .layer(middleware::from_fn(add_response_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
