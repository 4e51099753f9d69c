//! Practice sessions: a run of questions picked by [`selection`](super::selection),
//! graded one at a time.
//!
//! Sessions live in memory only. Each answer is recorded against the question
//! bank, and XP for correct answers is credited to the linked user when there
//! is one. A failed XP write is logged and does not fail the answer.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::LexConfig;
use crate::error::AppError;
use crate::store::users::UserService;

use super::models::{xp_for, Difficulty, Question, QuestionView};
use super::selection::{adjust_difficulty, generate_next_question, SelectionPolicy};
use super::store::QuestionStore;

#[derive(Debug, Clone)]
pub struct PracticeSession {
    pub id: Uuid,
    pub user_id: Option<String>,
    pub answered: u32,
    pub correct: u32,
    pub xp: u32,
    pub topics: BTreeSet<String>,
    /// Difficulty of each answered question, in order.
    pub difficulties: Vec<Difficulty>,
    /// Question awaiting an answer. `None` while an answer is being graded
    /// and once the session is complete.
    pub current_question_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub user_id: Option<String>,
    pub answered: u32,
    pub correct: u32,
    pub accuracy: f64,
    pub xp_earned: u32,
    pub topics: Vec<String>,
    pub difficulties: Vec<Difficulty>,
    pub elapsed_seconds: i64,
    pub session_length: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    pub session: SessionSummary,
    pub question: QuestionView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_option: u32,
    pub explanation: String,
    pub xp_awarded: u32,
    pub next_question: Option<QuestionView>,
    pub session: SessionSummary,
}

pub struct PracticeEngine {
    questions: QuestionStore,
    users: UserService,
    policy: SelectionPolicy,
    session_length: u32,
    idle: Duration,
    sessions: Mutex<HashMap<Uuid, PracticeSession>>,
}

impl PracticeEngine {
    pub fn new(questions: QuestionStore, users: UserService, config: &LexConfig) -> Self {
        Self {
            questions,
            users,
            policy: SelectionPolicy::from(config),
            session_length: config.session_length,
            idle: Duration::minutes(config.session_idle_minutes),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn questions(&self) -> &QuestionStore {
        &self.questions
    }

    fn summarize(&self, s: &PracticeSession, now: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            session_id: s.id,
            user_id: s.user_id.clone(),
            answered: s.answered,
            correct: s.correct,
            accuracy: if s.answered == 0 { 0.0 } else { f64::from(s.correct) / f64::from(s.answered) },
            xp_earned: s.xp,
            topics: s.topics.iter().cloned().collect(),
            difficulties: s.difficulties.clone(),
            elapsed_seconds: (now - s.started_at).num_seconds(),
            session_length: self.session_length,
            completed: s.answered >= self.session_length,
        }
    }

    async fn evict_idle(&self, now: DateTime<Utc>) {
        let cutoff = now - self.idle;
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_activity > cutoff);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "evicted idle practice sessions");
        }
    }

    pub async fn start(&self, user_id: Option<String>) -> Result<SessionStart, AppError> {
        let now = Utc::now();
        self.evict_idle(now).await;

        if let Some(uid) = &user_id {
            self.users.get(uid).await?;
        }

        let bank = self.questions.snapshot().await?;
        let first = {
            let mut rng = rand::rng();
            generate_next_question(&bank, now, &self.policy, &mut rng).cloned()
        }
        .ok_or_else(|| AppError::not_found("practice questions"))?;

        let session = PracticeSession {
            id: Uuid::new_v4(),
            user_id,
            answered: 0,
            correct: 0,
            xp: 0,
            topics: BTreeSet::new(),
            difficulties: Vec::new(),
            current_question_id: Some(first.id.clone()),
            started_at: now,
            last_activity: now,
        };
        let summary = self.summarize(&session, now);
        info!(session_id = %session.id, user_id = ?session.user_id, "practice session started");
        self.sessions.lock().await.insert(session.id, session);

        Ok(SessionStart { session: summary, question: QuestionView::from(&first) })
    }

    pub async fn answer(&self, session_id: Uuid, question_id: &str, selected: u32) -> Result<AnswerOutcome, AppError> {
        let now = Utc::now();

        // Claim the presented question so a concurrent answer cannot grade it twice.
        let (user_id, is_last) = {
            let mut sessions = self.sessions.lock().await;
            let s = sessions
                .get_mut(&session_id)
                .ok_or_else(|| AppError::not_found(format!("practice session {session_id}")))?;
            if s.answered >= self.session_length {
                return Err(AppError::validation("practice session is already complete"));
            }
            if s.current_question_id.as_deref() != Some(question_id) {
                return Err(AppError::validation(format!(
                    "question {question_id} is not the question currently presented"
                )));
            }
            s.current_question_id = None;
            (s.user_id.clone(), s.answered + 1 >= self.session_length)
        };

        let graded = self.grade(question_id, selected, now, !is_last).await;
        let (question, correct, next) = match graded {
            Ok(g) => g,
            Err(e) => {
                if let Some(s) = self.sessions.lock().await.get_mut(&session_id) {
                    s.current_question_id = Some(question_id.to_string());
                }
                return Err(e);
            }
        };

        let xp = xp_for(question.difficulty, correct);
        let summary = {
            let mut sessions = self.sessions.lock().await;
            let s = sessions
                .get_mut(&session_id)
                .ok_or_else(|| AppError::not_found(format!("practice session {session_id}")))?;
            s.answered += 1;
            if correct {
                s.correct += 1;
            }
            s.xp += xp;
            s.topics.insert(question.topic.clone());
            s.difficulties.push(question.difficulty);
            s.current_question_id = next.as_ref().map(|q| q.id.clone());
            s.last_activity = now;
            self.summarize(s, now)
        };

        if xp > 0 {
            if let Some(uid) = &user_id {
                if let Err(e) = self.users.add_experience(uid, i64::from(xp)).await {
                    warn!(user_id = %uid, xp, error = %e, "failed to credit practice XP");
                }
            }
        }

        debug!(%session_id, %question_id, correct, xp, answered = summary.answered, "practice answer graded");
        Ok(AnswerOutcome {
            correct,
            correct_option: question.correct_option,
            explanation: question.explanation.clone(),
            xp_awarded: xp,
            next_question: next.as_ref().map(QuestionView::from),
            session: summary,
        })
    }

    /// Check the answer, record the attempt and, when wanted, pick the follow-up.
    async fn grade(
        &self,
        question_id: &str,
        selected: u32,
        now: DateTime<Utc>,
        pick_next: bool,
    ) -> Result<(Question, bool, Option<Question>), AppError> {
        let question = self.questions.get(question_id).await?;
        if selected as usize >= question.options.len() {
            return Err(AppError::validation(format!(
                "selectedOption {selected} is out of range for {} options",
                question.options.len()
            )));
        }
        let correct = selected == question.correct_option;
        let question = self.questions.record_attempt(question_id, correct, now).await?;

        let next = if pick_next {
            let bank = self.questions.snapshot().await?;
            let mut rng = rand::rng();
            adjust_difficulty(&bank, &question, correct, now, &self.policy, &mut rng).cloned()
        } else {
            None
        };
        Ok((question, correct, next))
    }

    pub async fn summary(&self, session_id: Uuid) -> Result<SessionSummary, AppError> {
        let sessions = self.sessions.lock().await;
        let s = sessions
            .get(&session_id)
            .ok_or_else(|| AppError::not_found(format!("practice session {session_id}")))?;
        Ok(self.summarize(s, Utc::now()))
    }

    /// End a session and return its final summary.
    pub async fn end(&self, session_id: Uuid) -> Result<SessionSummary, AppError> {
        let s = self
            .sessions
            .lock()
            .await
            .remove(&session_id)
            .ok_or_else(|| AppError::not_found(format!("practice session {session_id}")))?;
        let summary = self.summarize(&s, Utc::now());
        info!(%session_id, answered = summary.answered, xp = summary.xp_earned, "practice session ended");
        Ok(summary)
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::Records;
    use crate::store::users::{NewUser, Role};

    async fn engine_with(length: u32) -> (PracticeEngine, UserService) {
        let questions = QuestionStore::new(Records::memory());
        questions.seed_defaults().await.unwrap();
        let users = UserService::new(Records::memory()).with_hash_cost(4);
        let mut lex = Config::test_default().lex;
        lex.session_length = length;
        (PracticeEngine::new(questions, users.clone(), &lex), users)
    }

    async fn correct_answer(engine: &PracticeEngine, question_id: &str) -> u32 {
        engine.questions().get(question_id).await.unwrap().correct_option
    }

    #[tokio::test]
    async fn full_session_runs_to_length() {
        let (engine, _) = engine_with(3).await;
        let start = engine.start(None).await.unwrap();
        let mut current = start.question.id.clone();

        for i in 0..3 {
            let right = correct_answer(&engine, &current).await;
            let out = engine.answer(start.session.session_id, &current, right).await.unwrap();
            assert!(out.correct);
            assert_eq!(out.session.answered, i + 1);
            match out.next_question {
                Some(next) => current = next.id,
                None => assert!(out.session.completed),
            }
        }

        let summary = engine.summary(start.session.session_id).await.unwrap();
        assert!(summary.completed);
        assert_eq!(summary.correct, 3);
        assert_eq!(summary.accuracy, 1.0);
        assert_eq!(summary.difficulties.len(), 3);
        assert!(summary.xp_earned >= 30);

        let err = engine.answer(start.session.session_id, &current, 0).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn wrong_question_and_bad_option_are_rejected() {
        let (engine, _) = engine_with(5).await;
        let start = engine.start(None).await.unwrap();
        let id = start.session.session_id;

        let err = engine.answer(id, "some-other-question", 0).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = engine.answer(id, &start.question.id, 99).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // still answerable after a rejected option
        let out = engine.answer(id, &start.question.id, 0).await.unwrap();
        assert_eq!(out.session.answered, 1);
    }

    #[tokio::test]
    async fn incorrect_answers_earn_nothing_and_are_recorded() {
        let (engine, _) = engine_with(5).await;
        let start = engine.start(None).await.unwrap();
        let qid = start.question.id.clone();
        let right = correct_answer(&engine, &qid).await;
        let wrong = if right == 0 { 1 } else { 0 };

        let out = engine.answer(start.session.session_id, &qid, wrong).await.unwrap();
        assert!(!out.correct);
        assert_eq!(out.xp_awarded, 0);
        assert_eq!(out.correct_option, right);

        let q = engine.questions().get(&qid).await.unwrap();
        assert_eq!(q.attempts, 1);
        assert_eq!(q.last_correct, Some(false));
    }

    #[tokio::test]
    async fn xp_is_credited_to_the_linked_user() {
        let (engine, users) = engine_with(5).await;
        let user = users
            .create(NewUser {
                email: "learner@example.com".into(),
                password: "password123".into(),
                name: "Learner".into(),
                role: Some(Role::Student),
                profile: None,
            })
            .await
            .unwrap();

        let start = engine.start(Some(user.id.clone())).await.unwrap();
        let qid = start.question.id.clone();
        let right = correct_answer(&engine, &qid).await;
        let out = engine.answer(start.session.session_id, &qid, right).await.unwrap();

        let stored = users.get(&user.id).await.unwrap();
        assert_eq!(stored.experience_points, i64::from(out.xp_awarded));
        assert!(out.xp_awarded >= 10);
    }

    #[tokio::test]
    async fn unknown_user_cannot_start() {
        let (engine, _) = engine_with(5).await;
        let err = engine.start(Some("ghost".into())).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_bank_is_not_found() {
        let users = UserService::new(Records::memory()).with_hash_cost(4);
        let engine = PracticeEngine::new(QuestionStore::new(Records::memory()), users, &Config::test_default().lex);
        assert!(matches!(engine.start(None).await.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn end_removes_the_session() {
        let (engine, _) = engine_with(5).await;
        let start = engine.start(None).await.unwrap();
        assert_eq!(engine.active_sessions().await, 1);
        engine.end(start.session.session_id).await.unwrap();
        assert_eq!(engine.active_sessions().await, 0);
        assert!(matches!(engine.summary(start.session.session_id).await.unwrap_err(), AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted_on_start() {
        let (engine, _) = engine_with(5).await;
        let old = engine.start(None).await.unwrap();
        {
            let mut sessions = engine.sessions.lock().await;
            let s = sessions.get_mut(&old.session.session_id).unwrap();
            s.last_activity -= Duration::hours(3);
        }
        engine.start(None).await.unwrap();
        assert_eq!(engine.active_sessions().await, 1);
        assert!(engine.summary(old.session.session_id).await.is_err());
    }
}
