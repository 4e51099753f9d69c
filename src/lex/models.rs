//! Lex question records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::store::Record;
use crate::store::models::ContentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Experience points for a correct answer at this difficulty.
    pub fn xp_reward(self) -> u32 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 20,
            Difficulty::Hard => 30,
        }
    }
}

/// XP earned by one answer.
pub fn xp_for(difficulty: Difficulty, correct: bool) -> u32 {
    if correct { difficulty.xp_reward() } else { 0 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: u32,
    pub difficulty: Difficulty,
    pub topic: String,
    pub subject: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub hint: String,
    /// 0–100; higher is harder.
    pub grade_rating: u8,
    #[serde(default)]
    pub last_attempted: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attempts: u32,
    /// Outcome of the most recent attempt; `None` until first attempted.
    #[serde(default)]
    pub last_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Question {
    const COLLECTION: &'static str = "lexQuestions";
    const SEARCH_FIELDS: &'static [&'static str] = &["prompt", "topic", "explanation"];
    const FILTER_FIELDS: &'static [&'static str] = &["subject", "topic", "difficulty"];

    fn id(&self) -> &str {
        &self.id
    }
}

impl ContentRecord for Question {
    const KIND: &'static str = "question";

    fn validate(&self) -> Result<(), AppError> {
        super::store::validate(self)
    }
}

/// A question as presented to a student: no answer, no explanation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
    pub topic: String,
    pub subject: String,
    pub hint: String,
    pub grade_rating: u8,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            prompt: q.prompt.clone(),
            options: q.options.clone(),
            difficulty: q.difficulty,
            topic: q.topic.clone(),
            subject: q.subject.clone(),
            hint: q.hint.clone(),
            grade_rating: q.grade_rating,
        }
    }
}
