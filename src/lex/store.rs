//! Persistence for the Lex question bank.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::AppError;
use crate::store::Records;

use super::models::{Difficulty, Question};

#[derive(Clone)]
pub struct QuestionStore {
    records: Records<Question>,
}

impl QuestionStore {
    pub fn new(records: Records<Question>) -> Self {
        Self { records }
    }

    /// The whole bank, for selection.
    pub async fn snapshot(&self) -> Result<Vec<Question>, AppError> {
        self.records.all().await
    }

    pub async fn get(&self, id: &str) -> Result<Question, AppError> {
        self.records
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("question {id}")))
    }

    /// Bump the attempt count and store the outcome and time of this attempt.
    pub async fn record_attempt(&self, id: &str, correct: bool, at: DateTime<Utc>) -> Result<Question, AppError> {
        let mut q = self.get(id).await?;
        q.attempts = q.attempts.saturating_add(1);
        q.last_correct = Some(correct);
        q.last_attempted = Some(at);
        q.updated_at = at;
        if !self.records.replace(&q).await? {
            return Err(AppError::not_found(format!("question {id}")));
        }
        debug!(question_id = %id, correct, attempts = q.attempts, "attempt recorded");
        Ok(q)
    }

    pub async fn insert(&self, question: &Question) -> Result<(), AppError> {
        validate(question)?;
        self.records.insert(question).await
    }

    /// Insert the starter bank when empty. Returns how many were written.
    pub async fn seed_defaults(&self) -> Result<usize, AppError> {
        if self.records.count_all().await? > 0 {
            return Ok(0);
        }
        let bank = default_bank();
        for q in &bank {
            self.records.insert(q).await?;
        }
        info!(count = bank.len(), "seeded lex question bank");
        Ok(bank.len())
    }
}

pub fn validate(q: &Question) -> Result<(), AppError> {
    if q.prompt.trim().is_empty() {
        return Err(AppError::validation("prompt is required"));
    }
    if q.topic.trim().is_empty() {
        return Err(AppError::validation("topic is required"));
    }
    if q.options.len() < 2 {
        return Err(AppError::validation("a question needs at least two options"));
    }
    if q.correct_option as usize >= q.options.len() {
        return Err(AppError::validation(format!(
            "correctOption {} is out of range for {} options",
            q.correct_option,
            q.options.len()
        )));
    }
    if q.grade_rating > 100 {
        return Err(AppError::validation(format!("gradeRating must be 0-100, got {}", q.grade_rating)));
    }
    Ok(())
}

fn default_bank() -> Vec<Question> {
    let now = Utc::now();
    let q = |prompt: &str, options: &[&str], correct: u32, difficulty: Difficulty, topic: &str, subject: &str, rating: u8, explanation: &str, hint: &str| {
        Question {
            id: uuid::Uuid::new_v4().to_string(),
            prompt: prompt.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_option: correct,
            difficulty,
            topic: topic.into(),
            subject: subject.into(),
            explanation: explanation.into(),
            hint: hint.into(),
            grade_rating: rating,
            last_attempted: None,
            attempts: 0,
            last_correct: None,
            created_at: now,
            updated_at: now,
        }
    };
    vec![
        q("Solve 3x + 5 = 20.", &["x = 3", "x = 5", "x = 15", "x = 25/3"], 1, Difficulty::Easy, "Algebra", "Maths", 40,
          "Subtract 5 from both sides to get 3x = 15, then divide by 3.", "Undo the +5 first."),
        q("Factorise x² + 5x + 6.", &["(x + 1)(x + 6)", "(x + 2)(x + 3)", "(x − 2)(x − 3)", "x(x + 5) + 6"], 1, Difficulty::Medium, "Algebra", "Maths", 60,
          "Find two numbers that multiply to 6 and add to 5: 2 and 3.", "Product 6, sum 5."),
        q("Solve x² − 4x − 12 = 0.", &["x = 6 or x = −2", "x = −6 or x = 2", "x = 4 or x = 3", "x = 12 or x = −1"], 0, Difficulty::Hard, "Algebra", "Maths", 75,
          "(x − 6)(x + 2) = 0 gives x = 6 or x = −2.", "Factorise into two brackets."),
        q("Work out 2/3 + 1/4.", &["3/7", "11/12", "3/12", "2/12"], 1, Difficulty::Easy, "Fractions", "Maths", 35,
          "Common denominator 12: 8/12 + 3/12 = 11/12.", "Use a common denominator."),
        q("Work out 3/5 ÷ 9/10.", &["27/50", "2/3", "3/2", "1/3"], 1, Difficulty::Medium, "Fractions", "Maths", 65,
          "Multiply by the reciprocal: 3/5 × 10/9 = 30/45 = 2/3.", "Keep, change, flip."),
        q("A 2 kg mass accelerates at 3 m/s². What is the resultant force?", &["1.5 N", "5 N", "6 N", "0.67 N"], 2, Difficulty::Easy, "Forces", "Physics", 50,
          "F = m × a = 2 × 3 = 6 N.", "Use F = ma."),
        q("A car of mass 1200 kg goes from 0 to 20 m/s. What kinetic energy does it gain?", &["24 kJ", "240 kJ", "12 kJ", "480 kJ"], 1, Difficulty::Hard, "Energy", "Physics", 80,
          "Ek = ½mv² = 0.5 × 1200 × 400 = 240 000 J.", "Square the speed first."),
    ]
}
