//! Route configuration.

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Transfer lifecycle
        .route("/api/transfer/init", post(handlers::init_transfer))
        .route("/api/transfer/{transfer_id}", get(handlers::get_transfer_info))
        .route(
            "/api/transfer/{transfer_id}",
            delete(handlers::delete_transfer),
        )
        .route(
            "/api/transfer/{transfer_id}/chunk/{chunk_index}",
            put(handlers::upload_chunk),
        )
        .route(
            "/api/transfer/{transfer_id}/file",
            post(handlers::upload_file),
        )
        .route(
            "/api/transfer/{transfer_id}/complete",
            post(handlers::complete_transfer),
        )
        .route(
            "/api/transfer/{transfer_id}/download",
            get(handlers::download_transfer),
        )
        // Aggregate statistics
        .route("/api/stats", get(handlers::get_stats))
        // Health check (unauthenticated, for load balancers/probes)
        .route("/health", get(handlers::health_check));

    let ws_routes = Router::new().route("/ws/{transfer_id}", get(ws::ws_handler));

    Router::new()
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
