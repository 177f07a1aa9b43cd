//! Transcript review HTTP handlers (API key required).
//!
//! Endpoints:
//! - GET    /api/v1/transcripts?publish_id= - List transcript summaries, newest first
//! - GET    /api/v1/transcripts/{id}        - Full transcript
//! - DELETE /api/v1/transcripts/{id}        - Delete a transcript

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, Query, State};

use persona_types::transcript::{TranscriptRecord, TranscriptSummary};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::extractors::query::TranscriptListQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/transcripts - List transcript summaries.
pub async fn list_transcripts(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<TranscriptListQuery>,
) -> Result<Json<ApiResponse<Vec<TranscriptSummary>>>, AppError> {
    let start = Instant::now();
    let summaries = state.review_service.list(query.publish_id()).await?;
    Ok(Json(
        ApiResponse::success(summaries, start).with_link("self", "/api/v1/transcripts"),
    ))
}

/// GET /api/v1/transcripts/{id} - Full transcript with every message.
pub async fn get_transcript(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<TranscriptRecord>>, AppError> {
    let start = Instant::now();
    let record = state.review_service.get(&id).await?;
    Ok(Json(
        ApiResponse::success(record, start)
            .with_link("self", &format!("/api/v1/transcripts/{id}")),
    ))
}

/// DELETE /api/v1/transcripts/{id} - Irreversibly delete a transcript.
pub async fn delete_transcript(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    state.review_service.delete(&id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": true, "id": id }),
        start,
    )))
}
