pub mod cache;
pub mod config;
pub mod ebay;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;

use crate::handlers::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/listings", get(handlers::listings))
        .route("/api/feedback", get(handlers::feedback))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
