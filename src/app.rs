// Router assembly. Kept separate from main so integration tests can drive
// the full application with tower's `oneshot` without binding a socket.

use crate::handlers::{self, SharedUpscaler};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::Level;

pub fn create_app(upscaler: SharedUpscaler) -> Router {
    // The transport-level body cap sits above the configured ceiling so the
    // pipeline's own size check is what rejects oversized uploads, with its
    // specific error message. Doubling leaves room for multipart framing.
    let body_limit = upscaler.config().max_file_size * 2;

    Router::new()
        .route("/upscale", post(handlers::upscale))
        .route("/health", get(handlers::health))
        .route("/info", get(handlers::info))
        .layer(DefaultBodyLimit::max(body_limit))
        // CORS for browser frontends
        .layer(CorsLayer::permissive())
        // Request/response logging
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().level(Level::INFO)))
        .with_state(upscaler)
}
