use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{download, handlers, middleware::metrics_middleware, torznab};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Service
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/status", get(handlers::get_status))
        .route("/metrics", get(handlers::get_metrics))
        // Torznab
        .route("/torznab/caps/{indexes}", get(torznab::caps))
        .route("/torznab/{indexes}", get(torznab::torznab))
        .route("/torznab/{indexes}/api", get(torznab::torznab))
        // Signed downloads (HEAD is served by the GET handlers)
        .route("/download/{token}/{filename}", get(download::download))
        .route("/d/{token}/{filename}", get(download::download))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
