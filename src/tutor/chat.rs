//! Tutor chat: single-message chat with dashboard context, and the
//! transcript form used by the streaming chat widget.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::AppError;
use crate::llm::{ChatMessage, ProviderChain};

use super::prompt::{PromptBuilder, CHAT_CONTEXT, PERSONA};

/// Reply sent when no provider answers a `/api/chat` request.
pub const APOLOGY: &str =
    "I'm sorry, I'm having trouble connecting to the tutor right now. Please try again in a moment.";

const MAX_TRANSCRIPT: usize = 40;

fn render_context(context: Option<&Value>) -> String {
    match context {
        None | Some(Value::Null) => "(nothing)".to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => "(nothing)".to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

pub async fn chat(
    chain: &ProviderChain,
    prompts_dir: &Path,
    message: &str,
    context: Option<&Value>,
) -> Result<String, AppError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::validation("message is required"));
    }
    let system = PromptBuilder::new(prompts_dir)
        .layer(PERSONA)
        .layer(CHAT_CONTEXT)
        .var("context", render_context(context))
        .build();
    Ok(chain.complete_prompt(&system, message).await?)
}

/// Check a client transcript and put the tutor persona in front of it.
pub fn prepare_transcript(prompts_dir: &Path, messages: &[ChatMessage]) -> Result<Vec<ChatMessage>, AppError> {
    if messages.is_empty() {
        return Err(AppError::validation("messages must not be empty"));
    }
    for m in messages {
        if !matches!(m.role.as_str(), "system" | "user" | "assistant") {
            return Err(AppError::validation(format!("unknown message role: {}", m.role)));
        }
    }
    if !messages.iter().any(|m| m.role == "user" && !m.content.trim().is_empty()) {
        return Err(AppError::validation("messages must include a user message"));
    }

    let tail = &messages[messages.len().saturating_sub(MAX_TRANSCRIPT)..];
    let mut out = Vec::with_capacity(tail.len() + 1);
    if !tail.iter().any(|m| m.role == "system") {
        out.push(ChatMessage::system(PromptBuilder::new(prompts_dir).layer(PERSONA).build()));
    }
    out.extend(tail.iter().cloned());
    Ok(out)
}

static CANNED: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    let topic = |words: &str, reply: &'static str| (Regex::new(&format!(r"(?i)\b(?:{words})\b")).unwrap(), reply);
    vec![
        topic(
            r"algebra|equations?|solve\s+for|quadratics?",
            "For equations, do the same thing to both sides until the unknown is on its own. \
             Start by undoing any addition or subtraction, then multiplication or division. \
             Try it and tell me where you get stuck.",
        ),
        topic(
            r"fractions?|denominators?|numerators?",
            "To add or subtract fractions, first rewrite them over a common denominator. \
             To divide, multiply by the reciprocal of the second fraction. \
             Which step is giving you trouble?",
        ),
        topic(
            r"physics|forces?|energy|velocity|acceleration",
            "In physics questions, write down the equation you need, list the values you know \
             with their units, then substitute. Which quantity are you trying to find?",
        ),
        topic(
            r"exams?|revision|revise|revising|tests?",
            "A good revision routine mixes short topic reviews with timed past-paper questions. \
             Check your answers against the mark scheme and note the topics you drop marks on. \
             The Past Papers section is a great place to start.",
        ),
        topic(
            r"homework|assignments?",
            "You can find your homework in the Homework section of your dashboard. \
             Tell me which question you're working on and I'll help you think it through.",
        ),
        topic(
            r"hello|hi|hey|good\s+morning|good\s+afternoon",
            "Hi! I'm your ProAcademics tutor. What are you studying today?",
        ),
    ]
});

const CANNED_FALLBACK: &str = "That's a great question. Can you tell me a bit more about the topic and what you've \
                               tried so far? Then we can work through it step by step.";

/// Offline reply for the chat widget, matched on whole keywords of the latest user message.
pub fn canned_response(message: &str) -> &'static str {
    CANNED
        .iter()
        .find(|(pattern, _)| pattern.is_match(message))
        .map_or(CANNED_FALLBACK, |(_, reply)| *reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;
    use crate::llm::providers::dummy::DummyProvider;
    use serde_json::json;

    #[test]
    fn canned_responses_match_keywords() {
        assert!(canned_response("How do I solve this EQUATION?").contains("both sides"));
        assert!(canned_response("adding fractions").contains("common denominator"));
        assert!(canned_response("what is a force").contains("equation you need"));
        assert!(canned_response("exam tips please").contains("Past Papers"));
        assert!(canned_response("help with my homework").contains("Homework section"));
        assert!(canned_response("hi").starts_with("Hi!"));
        assert!(canned_response("tell me about volcanoes").contains("step by step"));
    }

    #[test]
    fn canned_keywords_match_whole_words_only() {
        assert!(canned_response("where is my latest homework").contains("Homework section"));
        assert!(canned_response("how do I reinforce this idea").contains("step by step"));
        assert!(canned_response("this one is hard").contains("step by step"));
        assert!(canned_response("Tests next week!").contains("Past Papers"));
    }

    #[test]
    fn context_renders_strings_and_objects() {
        assert_eq!(render_context(None), "(nothing)");
        assert_eq!(render_context(Some(&json!("  Year 10 Maths "))), "Year 10 Maths");
        assert!(render_context(Some(&json!({ "page": "homework" }))).contains("\"page\""));
    }

    #[test]
    fn transcript_gets_a_persona_once() {
        let dir = Path::new("/nonexistent");
        let out = prepare_transcript(dir, &[ChatMessage::user("hi")]).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].role, "system");
        assert!(out[0].content.contains("ProAcademics AI tutor"));

        let own = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        assert_eq!(prepare_transcript(dir, &own).unwrap(), own);
    }

    #[test]
    fn transcript_validation() {
        let dir = Path::new("/nonexistent");
        assert!(prepare_transcript(dir, &[]).is_err());
        assert!(prepare_transcript(dir, &[ChatMessage::assistant("hello")]).is_err());
        let bad = ChatMessage { role: "tool".into(), content: "x".into() };
        assert!(prepare_transcript(dir, &[bad, ChatMessage::user("hi")]).is_err());
    }

    #[tokio::test]
    async fn chat_returns_provider_text() {
        let chain = ProviderChain::new(vec![LlmProvider::Dummy(DummyProvider::replying("Try factorising."))]);
        let reply = chat(&chain, Path::new("/nonexistent"), "help", Some(&json!("GCSE"))).await.unwrap();
        assert_eq!(reply, "Try factorising.");
        assert!(matches!(
            chat(&chain, Path::new("/nonexistent"), "  ", None).await.unwrap_err(),
            AppError::Validation(_)
        ));
    }
}
