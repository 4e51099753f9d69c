//! Lex: adaptive multiple-choice practice.
//!
//! - **models**: `Question`, `Difficulty`, XP table.
//! - **selection**: pure next-question and difficulty-adjustment heuristics.
//! - **store**: `QuestionStore` over the `lexQuestions` collection.
//! - **practice**: in-memory practice sessions driving the above.

pub mod models;
pub mod practice;
pub mod selection;
pub mod store;

pub use models::{xp_for, Difficulty, Question, QuestionView};
pub use practice::{PracticeEngine, SessionSummary};
pub use selection::{adjust_difficulty, generate_next_question, SelectionPolicy};
pub use store::QuestionStore;
