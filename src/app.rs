//! Service wiring: repositories, provider chain and practice engine from a
//! resolved [`Config`].

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::http::AppState;
use crate::lex::{PracticeEngine, Question, QuestionStore};
use crate::llm::ProviderChain;
use crate::store::content::ContentService;
use crate::store::topic_vault::TopicVaultService;
use crate::store::users::UserService;
use crate::store::{Backend, Records};

pub fn build_state(config: &Config, backend: &Backend, chain: ProviderChain) -> AppState {
    let users = UserService::new(backend.records());
    let questions: Records<Question> = backend.records();
    let practice = PracticeEngine::new(QuestionStore::new(questions.clone()), users.clone(), &config.lex);

    AppState {
        service_name: Arc::from(config.service_name.as_str()),
        storage: backend.name(),
        chain: Arc::new(chain),
        prompts_dir: Arc::new(config.ai.prompts_dir.clone()),
        users,
        topic_vault: TopicVaultService::new(backend.records()),
        past_papers: ContentService::new(backend.records()),
        homework: ContentService::new(backend.records()),
        question_videos: ContentService::new(backend.records()),
        lex_questions: ContentService::new(questions),
        practice: Arc::new(practice),
    }
}

/// Startup data: the admin account and, when enabled, the starter content.
/// Everything here is insert-if-absent.
pub async fn seed(state: &AppState, config: &Config) -> Result<(), AppError> {
    match &config.admin {
        Some(admin) => {
            state.users.ensure_admin(admin).await?;
        }
        None => warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no admin account seeded"),
    }

    if config.database.seed_content {
        let lessons = state.topic_vault.seed_defaults().await?;
        let questions = state.practice.questions().seed_defaults().await?;
        info!(lessons, questions, "starter content checked");
    }
    Ok(())
}
