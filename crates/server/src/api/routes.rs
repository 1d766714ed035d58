use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};

use previewer_core::DeliveryMode;

use super::{handlers, middleware::metrics_middleware, stream, upload};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config().server.max_upload_bytes;
    let static_dir = state.config().server.static_dir.clone();

    let mut api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Upload
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::max(upload_limit)),
        );

    // Previews are only left on disk in URL mode
    if state.mode() == DeliveryMode::Url {
        api_routes = api_routes.route("/stream/{file_name}", get(stream::get_preview));
    }

    // A panicking handler becomes a 500 that still shows up in the metrics
    let mut router = api_routes
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state);

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router.layer(TraceLayer::new_for_http())
}
