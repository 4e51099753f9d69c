//! AI tutor: answer evaluation and chat over the LLM provider chain.
//!
//! - **prompt**: layered `{{var}}` templates with built-in defaults.
//! - **evaluate**: structured marking with a free-text fallback.
//! - **chat**: contextual chat, transcript chat and offline replies.

pub mod chat;
pub mod evaluate;
pub mod prompt;
