//! Axum router configuration with middleware.
//!
//! API routes live under `/api/`. Stored images are served from the upload
//! directory under `/uploads/`. Middleware: CORS from configuration, request
//! tracing, and a body limit sized to the upload limit.

use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use echolocator_core::service::gateway::ASSET_URL_PREFIX;

use crate::http::handlers;
use crate::state::AppState;

/// Room for the form fields and multipart framing around the image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.ingest.max_image_bytes + FORM_OVERHEAD_BYTES;

    let api_routes = Router::new()
        .route(
            "/items",
            post(handlers::items::create_item)
                .get(handlers::items::list_items)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/items/recent", get(handlers::items::recent_items))
        .route("/items/{id}", get(handlers::items::get_item))
        .route("/search", get(handlers::search::search))
        .route("/stats", get(handlers::stats::get_stats));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health_check))
        .nest_service(ASSET_URL_PREFIX, ServeDir::new(&state.upload_dir))
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Exact origins from configuration; `*` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o.trim() == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    title: String,
    version: String,
}

/// GET /health - Liveness plus the configured API title and version.
async fn health_check(State(state): State<AppState>) -> axum::Json<Health> {
    axum::Json(Health {
        status: "ok",
        title: state.config.api_title.clone(),
        version: state.config.api_version.clone(),
    })
}
