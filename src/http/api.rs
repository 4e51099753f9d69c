//! Handlers for `/api/health` and the AI tutor routes.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::AppError;
use crate::llm::ChatMessage;
use crate::tutor::chat::{self, APOLOGY};
use crate::tutor::evaluate::{self, QuestionData};

use super::response::ApiJson;
use super::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct EvaluateRequest {
    question_data: QuestionData,
}

#[derive(Deserialize)]
pub(super) struct ChatRequest {
    message: String,
    #[serde(default)]
    context: Option<Value>,
}

#[derive(Deserialize)]
pub(super) struct StreamRequest {
    messages: Vec<ChatMessage>,
}

/// GET /api/health
pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": &*state.service_name,
        "storage": state.storage,
        "aiProviders": state.chain.names(),
        "activeSessions": state.practice.active_sessions().await,
    }))
}

/// POST /api/ai/evaluate-answer
pub(super) async fn evaluate_answer(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EvaluateRequest>,
) -> Result<Json<Value>, AppError> {
    let eval = evaluate::evaluate_answer(&state.chain, &state.prompts_dir, &req.question_data).await?;
    Ok(Json(json!({
        "success": true,
        "evaluation": eval.evaluation,
        "verdict": eval.verdict,
        "marksAwarded": eval.marks_awarded,
    })))
}

/// POST /api/chat. Provider failures degrade to an apology, not an error.
pub(super) async fn chat(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    match chat::chat(&state.chain, &state.prompts_dir, &req.message, req.context.as_ref()).await {
        Ok(response) => Ok(Json(json!({ "success": true, "response": response }))),
        Err(AppError::Llm(e)) => {
            warn!(error = %e, "chat providers unavailable, sending apology");
            Ok(Json(json!({ "success": true, "response": APOLOGY, "fallback": true })))
        }
        Err(e) => Err(e),
    }
}

/// POST /api/chat/stream. One JSON reply, keyword-matched text when offline.
pub(super) async fn chat_stream(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StreamRequest>,
) -> Result<Json<Value>, AppError> {
    let transcript = chat::prepare_transcript(&state.prompts_dir, &req.messages)?;
    let content = match state.chain.complete(&transcript).await {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "chat stream providers unavailable, using canned reply");
            let last_user = transcript
                .iter()
                .rev()
                .find(|m| m.role == "user")
                .map(|m| m.content.as_str())
                .unwrap_or_default();
            chat::canned_response(last_user).to_string()
        }
    };
    Ok(Json(json!({ "content": content, "role": "assistant" })))
}
