//! TopicVault: the catalogue of video lessons browsed by students.

use chrono::Utc;
use serde::Serialize;

use crate::error::AppError;

use super::content::ContentService;
use super::models::TopicVaultEntry;
use super::query::FieldCount;
use super::records::Records;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicVaultStats {
    pub total: u64,
    pub by_subject: Vec<FieldCount>,
    pub by_exam_board: Vec<FieldCount>,
}

#[derive(Clone)]
pub struct TopicVaultService {
    content: ContentService<TopicVaultEntry>,
}

impl TopicVaultService {
    pub fn new(records: Records<TopicVaultEntry>) -> Self {
        Self { content: ContentService::new(records) }
    }

    pub fn content(&self) -> &ContentService<TopicVaultEntry> {
        &self.content
    }

    pub async fn stats(&self) -> Result<TopicVaultStats, AppError> {
        Ok(TopicVaultStats {
            total: self.content.count_all().await?,
            by_subject: self.content.count_by("subject").await?,
            by_exam_board: self.content.count_by("examBoard").await?,
        })
    }

    /// Insert the starter catalogue when the collection is empty.
    pub async fn seed_defaults(&self) -> Result<usize, AppError> {
        self.content.seed_if_empty(default_entries()).await
    }
}

fn default_entries() -> Vec<TopicVaultEntry> {
    let now = Utc::now();
    let entry = |title: &str, subject: &str, topic: &str, sub_topic: &str, board: &str, tags: &[&str], minutes: u32| {
        TopicVaultEntry {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            subject: subject.into(),
            topic: topic.into(),
            sub_topic: Some(sub_topic.into()),
            exam_board: Some(board.into()),
            level: Some("GCSE".into()),
            description: format!("{title}: worked examples and exam technique."),
            video_url: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            difficulty: None,
            duration_minutes: Some(minutes),
            created_at: now,
            updated_at: now,
        }
    };
    vec![
        entry("Solving Linear Equations", "Maths", "Algebra", "Linear equations", "AQA", &["equations", "algebra"], 12),
        entry("Factorising Quadratics", "Maths", "Algebra", "Quadratics", "Edexcel", &["quadratics", "factorising"], 15),
        entry("Adding and Subtracting Fractions", "Maths", "Number", "Fractions", "AQA", &["fractions"], 10),
        entry("Newton's Laws of Motion", "Physics", "Forces", "Newton's laws", "AQA", &["forces", "motion"], 14),
        entry("Energy Stores and Transfers", "Physics", "Energy", "Energy transfers", "OCR", &["energy"], 11),
        entry("Cell Structure", "Biology", "Cells", "Eukaryotes and prokaryotes", "Edexcel", &["cells", "microscopy"], 9),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::query::ListQuery;
    use serde_json::json;

    #[tokio::test]
    async fn seed_then_stats() {
        let svc = TopicVaultService::new(Records::memory());
        let n = svc.seed_defaults().await.unwrap();
        assert_eq!(n, 6);
        assert_eq!(svc.seed_defaults().await.unwrap(), 0);

        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.total, 6);
        assert_eq!(stats.by_subject[0], FieldCount { value: "Maths".into(), count: 3 });
        assert_eq!(stats.by_exam_board[0], FieldCount { value: "AQA".into(), count: 3 });
    }

    #[tokio::test]
    async fn search_spans_tags_and_sub_topic() {
        let svc = TopicVaultService::new(Records::memory());
        svc.seed_defaults().await.unwrap();

        let page = svc.content().list(&ListQuery::default().with_search("MICROSCOPY")).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].subject, "Biology");

        let page = svc
            .content()
            .list(&ListQuery::default().with_search("quadratics").with_filter("subject", "Maths"))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Factorising Quadratics");
    }

    #[tokio::test]
    async fn unspecified_exam_board_is_counted() {
        let svc = TopicVaultService::new(Records::memory());
        svc.content()
            .create_from_json(json!({ "title": "Moles", "subject": "Chemistry", "topic": "Quantitative" }))
            .await
            .unwrap();
        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.by_exam_board, vec![FieldCount { value: "unspecified".into(), count: 1 }]);
    }
}
