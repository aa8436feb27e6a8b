//! Router assembly: HTTP endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - the practice API at the root (`/submit`, `/analyze`, `/generate/*`, ...)
/// - CORS (allow any origin/method/headers); the browser editor is served elsewhere
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(http::http_health))
        .route("/submit", post(http::http_post_submit))
        .route("/analyze", post(http::http_post_analyze))
        .route("/generate/first", post(http::http_post_generate_first))
        .route("/generate/next", post(http::http_post_generate_next))
        .route("/weakness", post(http::http_post_weakness))
        .route("/evaluate", post(http::http_post_evaluate))
        .route("/hint", post(http::http_post_hint))
        .route("/progress", post(http::http_post_progress))
        .route("/practice/open", post(http::http_post_practice_open))
        .route("/questions/:id", get(http::http_get_question))
        .route("/questions/:id/scratch", put(http::http_put_scratch))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
