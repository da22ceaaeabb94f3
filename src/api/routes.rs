use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Titles
        .route("/titles", get(handlers::search_titles))
        .route("/titles/export", get(handlers::export_titles))
        // Selector options and chart data
        .route("/facets", get(handlers::facets))
        .route("/stats", get(handlers::view_stats))
        // Dataset lifecycle
        .route("/dataset", get(handlers::dataset_summary))
        .route("/refresh", post(handlers::refresh))
}
