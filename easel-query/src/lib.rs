//! easel-query library - episode catalog filter service
//!
//! Read-only HTTP API over the catalog built by easel-etl.

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod filter;
pub mod model;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (read-only in production)
    pub db: SqlitePool,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let catalog = Router::new()
        .route("/episodes", get(api::get_episodes))
        .route("/materials", get(api::get_materials))
        .route("/tags", get(api::get_tags));

    Router::new()
        .merge(catalog)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
