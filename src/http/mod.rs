//! axum HTTP server.
//!
//! ## URL layout
//!
//! ```text
//! GET    /api/health
//! POST   /api/ai/evaluate-answer
//! POST   /api/chat
//! POST   /api/chat/stream
//! POST   /api/lex/sessions
//! GET    /api/lex/sessions/{id}
//! DELETE /api/lex/sessions/{id}
//! POST   /api/lex/sessions/{id}/answers
//! *      /api/admin/users               GET POST PUT DELETE
//! GET    /api/admin/users/stats
//! *      /api/admin/topic-vault         GET POST PUT DELETE
//! GET    /api/admin/topic-vault/stats
//! *      /api/admin/past-papers         GET POST PUT DELETE
//! *      /api/admin/homework            GET POST PUT DELETE
//! *      /api/admin/question-videos     GET POST PUT DELETE
//! *      /api/admin/lex-questions       GET POST PUT DELETE
//! ```

mod admin;
mod api;
mod lex;
pub mod response;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::lex::{PracticeEngine, Question};
use crate::llm::ProviderChain;
use crate::store::content::ContentService;
use crate::store::models::{Homework, PastPaper, QuestionVideo};
use crate::store::topic_vault::TopicVaultService;
use crate::store::users::UserService;

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone: every field is a shared handle.
#[derive(Clone)]
pub struct AppState {
    pub service_name: Arc<str>,
    /// Storage backend name reported by `/api/health`.
    pub storage: &'static str,
    pub chain: Arc<ProviderChain>,
    pub prompts_dir: Arc<PathBuf>,
    pub users: UserService,
    pub topic_vault: TopicVaultService,
    pub past_papers: ContentService<PastPaper>,
    pub homework: ContentService<Homework>,
    pub question_videos: ContentService<QuestionVideo>,
    pub lex_questions: ContentService<Question>,
    pub practice: Arc<PracticeEngine>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health",                     get(api::health))
        .route("/api/ai/evaluate-answer",         post(api::evaluate_answer))
        .route("/api/chat",                       post(api::chat))
        .route("/api/chat/stream",                post(api::chat_stream))
        .route("/api/lex/sessions",               post(lex::start))
        .route("/api/lex/sessions/{id}",          get(lex::summary).delete(lex::end))
        .route("/api/lex/sessions/{id}/answers",  post(lex::answer))
        .route(
            "/api/admin/users",
            get(admin::list_users)
                .post(admin::create_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/api/admin/users/stats",          get(admin::user_stats))
        .route("/api/admin/topic-vault",          admin::content_routes(state.topic_vault.content().clone()))
        .route("/api/admin/topic-vault/stats",    get(admin::topic_vault_stats))
        .route("/api/admin/past-papers",          admin::content_routes(state.past_papers.clone()))
        .route("/api/admin/homework",             admin::content_routes(state.homework.clone()))
        .route("/api/admin/question-videos",      admin::content_routes(state.question_videos.clone()))
        .route("/api/admin/lex-questions",        admin::content_routes(state.lex_questions.clone()))
        .with_state(state)
}

/// Bind and serve until `shutdown` is cancelled.
pub async fn serve(bind_addr: &str, state: AppState, shutdown: CancellationToken) -> Result<(), AppError> {
    let router = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("http server error: {e}")))?;

    info!("http server shut down");
    Ok(())
}
