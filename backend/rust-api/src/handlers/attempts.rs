use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    RecordAnswerRequest, StartAttemptRequest, SubmitAttemptRequest, SubmitMode,
};
use crate::services::AppState;

fn validated<T: Validate>(req: &T) -> AppResult<()> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}

/// POST /api/v1/quizzes/{quiz_id}/attempts
///
/// Idempotent against an active attempt: 200 with `resumed: true` instead of
/// 201 when the caller already has one open.
pub async fn start_attempt(
    State(state): State<Arc<AppState>>,
    Path(quiz_id): Path<String>,
    Json(req): Json<StartAttemptRequest>,
) -> AppResult<impl IntoResponse> {
    validated(&req)?;
    tracing::info!("Starting attempt: quiz={} user={}", quiz_id, req.user_id);

    let response = state
        .attempt_service()
        .start(&quiz_id, &req.user_id)
        .await?;

    let status = if response.resumed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct ResumeQuery {
    pub user_id: String,
}

/// GET /api/v1/attempts/{id}?user_id=...
pub async fn resume_attempt(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
    Query(query): Query<ResumeQuery>,
) -> AppResult<impl IntoResponse> {
    if query.user_id.is_empty() {
        return Err(AppError::Validation("user_id must not be empty".to_string()));
    }
    tracing::info!("Resuming attempt: {}", attempt_id);

    let response = state
        .attempt_service()
        .resume(&attempt_id, &query.user_id)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}

/// PUT /api/v1/attempts/{id}/answers/{question_id}
///
/// Upsert, last write wins. The ack never says whether the answer is right.
pub async fn record_answer(
    State(state): State<Arc<AppState>>,
    Path((attempt_id, question_id)): Path<(String, String)>,
    Json(req): Json<RecordAnswerRequest>,
) -> AppResult<impl IntoResponse> {
    validated(&req)?;
    tracing::info!(
        "Recording answer: attempt={} question={}",
        attempt_id,
        question_id
    );

    let ack = state
        .attempt_service()
        .record_answer(&attempt_id, &req.user_id, &question_id, &req.payload)
        .await?;

    Ok((StatusCode::OK, Json(ack)))
}

/// POST /api/v1/attempts/{id}/submit
///
/// Manual submission; the deadline worker uses the forced path internally.
pub async fn submit_attempt(
    State(state): State<Arc<AppState>>,
    Path(attempt_id): Path<String>,
    Json(req): Json<SubmitAttemptRequest>,
) -> AppResult<impl IntoResponse> {
    validated(&req)?;
    tracing::info!("Submitting attempt: {}", attempt_id);

    let response = state
        .attempt_service()
        .submit(&attempt_id, &req.user_id, SubmitMode::Manual)
        .await?;

    Ok((StatusCode::OK, Json(response)))
}
