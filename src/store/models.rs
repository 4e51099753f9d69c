//! Content record shapes: TopicVault entries, past papers, homework and
//! per-question video explanations.
//!
//! Field names serialise in camelCase, matching the documents the web
//! dashboards already read and write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::records::Record;

/// A content record managed through [`ContentService`](super::content::ContentService).
pub trait ContentRecord: Record {
    /// Human-readable name used in error messages ("past paper abc not found").
    const KIND: &'static str;

    /// Field presence checks run on create and update.
    fn validate(&self) -> Result<(), AppError>;
}

fn require(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(())
}

// ── TopicVault ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicVaultEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub sub_topic: Option<String>,
    #[serde(default)]
    pub exam_board: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for TopicVaultEntry {
    const COLLECTION: &'static str = "topicVault";
    const SEARCH_FIELDS: &'static [&'static str] = &["title", "description", "topic", "subTopic", "tags"];
    const FILTER_FIELDS: &'static [&'static str] = &["subject", "examBoard", "level", "topic"];

    fn id(&self) -> &str {
        &self.id
    }
}

impl ContentRecord for TopicVaultEntry {
    const KIND: &'static str = "topic vault entry";

    fn validate(&self) -> Result<(), AppError> {
        require(&self.title, "title")?;
        require(&self.subject, "subject")?;
        require(&self.topic, "topic")
    }
}

// ── Past papers ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperQuestion {
    pub number: String,
    #[serde(default)]
    pub marks: Option<u32>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PastPaper {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub exam_board: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    pub year: i32,
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub paper_number: Option<String>,
    #[serde(default)]
    pub paper_url: Option<String>,
    #[serde(default)]
    pub mark_scheme_url: Option<String>,
    #[serde(default)]
    pub questions: Vec<PaperQuestion>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for PastPaper {
    const COLLECTION: &'static str = "pastPapers";
    const SEARCH_FIELDS: &'static [&'static str] = &["title", "subject", "paperNumber"];
    const FILTER_FIELDS: &'static [&'static str] = &["subject", "examBoard", "level", "session"];

    fn id(&self) -> &str {
        &self.id
    }
}

impl ContentRecord for PastPaper {
    const KIND: &'static str = "past paper";

    fn validate(&self) -> Result<(), AppError> {
        require(&self.title, "title")?;
        require(&self.subject, "subject")?;
        if !(1900..=2100).contains(&self.year) {
            return Err(AppError::validation(format!("year out of range: {}", self.year)));
        }
        Ok(())
    }
}

// ── Homework ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Homework {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// User ids of the students it is assigned to.
    #[serde(default)]
    pub assigned_to: Vec<String>,
    #[serde(default)]
    pub question_ids: Vec<String>,
    #[serde(default = "default_homework_status")]
    pub status: String,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_homework_status() -> String {
    "assigned".into()
}

impl Record for Homework {
    const COLLECTION: &'static str = "homework";
    const SEARCH_FIELDS: &'static [&'static str] = &["title", "description", "subject"];
    const FILTER_FIELDS: &'static [&'static str] = &["subject", "status", "assignedTo"];

    fn id(&self) -> &str {
        &self.id
    }
}

impl ContentRecord for Homework {
    const KIND: &'static str = "homework";

    fn validate(&self) -> Result<(), AppError> {
        require(&self.title, "title")?;
        require(&self.subject, "subject")?;
        require(&self.status, "status")
    }
}

// ── Question videos ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionVideo {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub paper_id: Option<String>,
    #[serde(default)]
    pub question_number: Option<String>,
    pub title: String,
    pub subject: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub video_url: String,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for QuestionVideo {
    const COLLECTION: &'static str = "questionVideos";
    const SEARCH_FIELDS: &'static [&'static str] = &["title", "description", "topic"];
    const FILTER_FIELDS: &'static [&'static str] = &["subject", "topic", "paperId"];

    fn id(&self) -> &str {
        &self.id
    }
}

impl ContentRecord for QuestionVideo {
    const KIND: &'static str = "question video";

    fn validate(&self) -> Result<(), AppError> {
        require(&self.title, "title")?;
        require(&self.subject, "subject")?;
        require(&self.video_url, "videoUrl")
    }
}
