//! Handlers for `/api/lex/sessions*`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;

use super::response::{self, ApiJson};
use super::AppState;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnswerRequest {
    question_id: String,
    #[serde(alias = "selected")]
    selected_option: u32,
}

fn session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::validation(format!("invalid session id: {raw}")))
}

/// POST /api/lex/sessions, optional body `{ userId? }`.
pub(super) async fn start(State(state): State<AppState>, body: Bytes) -> Result<(StatusCode, Json<Value>), AppError> {
    let req: StartRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::validation(format!("invalid request body: {e}")))?
    };
    let user_id = req.user_id.filter(|u| !u.trim().is_empty());
    let started = state.practice.start(user_id).await?;
    Ok(response::created(started))
}

/// GET /api/lex/sessions/{id}
pub(super) async fn summary(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, AppError> {
    Ok(response::data(state.practice.summary(session_id(&id)?).await?))
}

/// DELETE /api/lex/sessions/{id}
pub(super) async fn end(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, AppError> {
    Ok(response::data(state.practice.end(session_id(&id)?).await?))
}

/// POST /api/lex/sessions/{id}/answers
pub(super) async fn answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AnswerRequest>,
) -> Result<Json<Value>, AppError> {
    let outcome = state
        .practice
        .answer(session_id(&id)?, &req.question_id, req.selected_option)
        .await?;
    Ok(response::data(outcome))
}
