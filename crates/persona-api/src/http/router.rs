//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS (the widget is embedded on third-party pages), tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chat widget
        .route(
            "/chat/{publish_id}/sessions",
            post(handlers::chat::open_session),
        )
        .route(
            "/sessions/{id}",
            get(handlers::chat::get_session).delete(handlers::chat::close_session),
        )
        .route(
            "/sessions/{id}/messages",
            post(handlers::chat::send_message),
        )
        .route(
            "/sessions/{id}/messages/{index}/feedback",
            post(handlers::chat::set_feedback),
        )
        // Transcript review
        .route(
            "/transcripts",
            get(handlers::transcript::list_transcripts),
        )
        .route(
            "/transcripts/{id}",
            get(handlers::transcript::get_transcript)
                .delete(handlers::transcript::delete_transcript),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
