//! Answer evaluation: mark a student's answer against a mark scheme.
//!
//! The model is asked for a JSON verdict. A reply that parses is rendered
//! from its fields; anything else is treated as free text and cleaned of
//! leaked prompt fragments and code fences. Either way the rendered text opens
//! with "Good job," or "Oh no," and ends with the video link when the
//! question has one.

use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::llm::{ProviderChain, ProviderError};

use super::prompt::{PromptBuilder, EVALUATE, PERSONA};

pub const GOOD_JOB: &str = "Good job,";
pub const OH_NO: &str = "Oh no,";

fn default_marks() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionData {
    #[serde(alias = "questionText")]
    pub question: String,
    #[serde(alias = "answer", alias = "userAnswer")]
    pub student_answer: String,
    #[serde(default)]
    pub mark_scheme: String,
    #[serde(default = "default_marks", alias = "maxMarks", alias = "totalMarks")]
    pub marks: u32,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl QuestionData {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.question.trim().is_empty() {
            return Err(AppError::validation("questionData.question is required"));
        }
        if self.student_answer.trim().is_empty() {
            return Err(AppError::validation("questionData.studentAnswer is required"));
        }
        if self.marks == 0 {
            return Err(AppError::validation("questionData.marks must be at least 1"));
        }
        Ok(())
    }

    fn video(&self) -> Option<&str> {
        self.video_url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    PartiallyCorrect,
    Incorrect,
}

impl Verdict {
    /// Lenient match on the model's spelling: case, spaces and hyphens are ignored.
    fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "correct" | "right" => Some(Verdict::Correct),
            "partially_correct" | "partial" | "partially" | "partly_correct" => Some(Verdict::PartiallyCorrect),
            "incorrect" | "wrong" | "not_correct" => Some(Verdict::Incorrect),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct StructuredReply {
    verdict: Verdict,
    /// `None` when the model sent something that is not a number.
    marks_awarded: Option<u32>,
    feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub evaluation: String,
    /// Present when the model replied with a valid structured verdict.
    pub verdict: Option<Verdict>,
    pub marks_awarded: Option<u32>,
}

pub async fn evaluate_answer(
    chain: &ProviderChain,
    prompts_dir: &Path,
    data: &QuestionData,
) -> Result<Evaluation, AppError> {
    data.validate()?;

    let system = PromptBuilder::new(prompts_dir).layer(PERSONA).build();
    let user = PromptBuilder::new(prompts_dir)
        .layer(EVALUATE)
        .var("question", data.question.trim())
        .var("student_answer", data.student_answer.trim())
        .var("mark_scheme", non_empty_or(&data.mark_scheme, "(no mark scheme supplied)"))
        .var("marks", data.marks.to_string())
        .var("topic", data.topic.as_deref().map_or("general", str::trim))
        .build();

    let reply = chain.complete_prompt(&system, &user).await?;
    interpret(&reply, data)
}

fn non_empty_or<'a>(s: &'a str, fallback: &'a str) -> &'a str {
    let s = s.trim();
    if s.is_empty() { fallback } else { s }
}

/// Turn a raw model reply into the rendered evaluation.
pub fn interpret(reply: &str, data: &QuestionData) -> Result<Evaluation, AppError> {
    let span = json_span(reply);
    if let Some(parsed) = span.as_ref().and_then(|(value, _)| structured(value, data.marks)) {
        let opener = match parsed.verdict {
            Verdict::Correct => GOOD_JOB,
            Verdict::PartiallyCorrect | Verdict::Incorrect => OH_NO,
        };
        let body = match parsed.marks_awarded {
            Some(awarded) => format!("{opener} you scored {awarded}/{} marks. {}", data.marks, parsed.feedback),
            None => format!("{opener} {}", parsed.feedback),
        };
        return Ok(Evaluation {
            evaluation: with_footer(body, data.video()),
            verdict: Some(parsed.verdict),
            marks_awarded: parsed.marks_awarded,
        });
    }

    debug!("evaluation reply is not structured, sanitising free text");
    let text = match &span {
        // Keep any usable feedback from a half-valid object, drop the rest of the JSON.
        Some((value, range)) => {
            let feedback = value.get("feedback").and_then(Value::as_str).unwrap_or_default();
            format!("{}{feedback}{}", &reply[..range.start], &reply[range.end..])
        }
        None => reply.to_string(),
    };
    let cleaned = sanitize(&text);
    if cleaned.is_empty() {
        return Err(ProviderError::BadResponse("evaluation reply was empty after cleanup".into()).into());
    }
    Ok(Evaluation {
        evaluation: with_footer(with_sentinel(&cleaned), data.video()),
        verdict: None,
        marks_awarded: None,
    })
}

/// First JSON object embedded in the reply, with the byte range it occupies.
fn json_span(reply: &str) -> Option<(Value, Range<usize>)> {
    for (start, _) in reply.match_indices('{') {
        let mut stream = serde_json::Deserializer::from_str(&reply[start..]).into_iter::<Value>();
        if let Some(Ok(value @ Value::Object(_))) = stream.next() {
            return Some((value, start..start + stream.byte_offset()));
        }
    }
    None
}

fn structured(value: &Value, max: u32) -> Option<StructuredReply> {
    let verdict = value.get("verdict").and_then(Value::as_str).and_then(Verdict::parse_loose)?;
    let feedback = value
        .get("feedback")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|f| !f.is_empty())?
        .to_string();
    let marks_awarded = value
        .get("marksAwarded")
        .or_else(|| value.get("marks_awarded"))
        .and_then(|m| awarded_marks(m, max));
    Some(StructuredReply { verdict, marks_awarded, feedback })
}

/// Numeric or numeric-string marks, rounded and clamped to `0..=max`.
fn awarded_marks(raw: &Value, max: u32) -> Option<u32> {
    let n = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    let rounded = n.round();
    if rounded > f64::from(max) {
        warn!(awarded = n, max, "model awarded more than the maximum, clamping");
    }
    Some(rounded.clamp(0.0, f64::from(max)) as u32)
}

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z]*[ \t]*$").unwrap());
static LEAKED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:question|mark scheme|student answer|student's answer|reply with|marks available)\b[^\n]*$")
        .unwrap()
});
static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^[ \t]*(?:evaluation|feedback|response)[ \t]*:[ \t]*").unwrap());
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());
static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:incorrect|not correct|partially|partly|wrong|mistake|missing|does not|doesn't|did not|didn't)\b").unwrap()
});

/// Strip code fences, echoed prompt lines and stray labels from free text.
pub fn sanitize(reply: &str) -> String {
    let text = FENCE.replace_all(reply, "");
    let text = LEAKED_LINE.replace_all(&text, "");
    let text = LABEL.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn with_sentinel(text: &str) -> String {
    if text.starts_with(GOOD_JOB) || text.starts_with(OH_NO) {
        return text.to_string();
    }
    let opener = if NEGATIVE.is_match(text) { OH_NO } else { GOOD_JOB };
    format!("{opener} {text}")
}

fn with_footer(body: String, video: Option<&str>) -> String {
    match video {
        Some(url) => format!("{body}\n\nWatch the video explanation: {url}"),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;
    use crate::llm::providers::dummy::DummyProvider;

    fn data(video: Option<&str>) -> QuestionData {
        QuestionData {
            question: "Solve 2x = 10".into(),
            student_answer: "x = 5".into(),
            mark_scheme: "x = 5 (1 mark)".into(),
            marks: 2,
            topic: Some("Algebra".into()),
            video_url: video.map(Into::into),
        }
    }

    #[test]
    fn structured_correct_reply_renders_good_job() {
        let reply = r#"{"verdict":"correct","marksAwarded":2,"feedback":"Clear working."}"#;
        let eval = interpret(reply, &data(Some("https://videos.test/q1"))).unwrap();
        assert!(eval.evaluation.starts_with("Good job,"));
        assert!(eval.evaluation.contains("2/2 marks"));
        assert!(eval.evaluation.ends_with("Watch the video explanation: https://videos.test/q1"));
        assert_eq!(eval.verdict, Some(Verdict::Correct));
        assert_eq!(eval.marks_awarded, Some(2));
    }

    #[test]
    fn fenced_json_with_partial_verdict_renders_oh_no() {
        let reply = "```json\n{\"verdict\": \"partially_correct\", \"marksAwarded\": 1, \"feedback\": \"Show the division step.\"}\n```";
        let eval = interpret(reply, &data(None)).unwrap();
        assert!(eval.evaluation.starts_with("Oh no,"));
        assert!(eval.evaluation.contains("1/2 marks"));
        assert!(!eval.evaluation.contains("Watch the video"));
    }

    #[test]
    fn over_awarded_marks_are_clamped() {
        let reply = r#"{"verdict":"correct","marksAwarded":9,"feedback":"Great."}"#;
        assert_eq!(interpret(reply, &data(None)).unwrap().marks_awarded, Some(2));
    }

    #[test]
    fn fractional_marks_are_rounded_and_the_json_is_not_shown() {
        let reply = r#"{"verdict":"partially_correct","marksAwarded":1.5,"feedback":"Half the method."}"#;
        let mut d = data(None);
        d.marks = 3;
        let eval = interpret(reply, &d).unwrap();
        assert_eq!(eval.evaluation, "Oh no, you scored 2/3 marks. Half the method.");
        assert_eq!(eval.verdict, Some(Verdict::PartiallyCorrect));
        assert_eq!(eval.marks_awarded, Some(2));
    }

    #[test]
    fn string_and_negative_marks_are_coerced() {
        let reply = r#"{"verdict":"Correct","marksAwarded":"2","feedback":"Spot on."}"#;
        assert_eq!(interpret(reply, &data(None)).unwrap().marks_awarded, Some(2));
        let reply = r#"{"verdict":"incorrect","marksAwarded":-1,"feedback":"Recheck the division."}"#;
        let eval = interpret(reply, &data(None)).unwrap();
        assert_eq!(eval.marks_awarded, Some(0));
        assert!(eval.evaluation.starts_with("Oh no, you scored 0/2 marks."));
    }

    #[test]
    fn non_numeric_marks_keep_the_verdict_without_a_score() {
        let reply = r#"{"verdict":"partially correct","marksAwarded":"some","feedback":"Nearly there."}"#;
        let eval = interpret(reply, &data(None)).unwrap();
        assert_eq!(eval.evaluation, "Oh no, Nearly there.");
        assert_eq!(eval.verdict, Some(Verdict::PartiallyCorrect));
        assert_eq!(eval.marks_awarded, None);
    }

    #[test]
    fn trailing_prose_after_the_object_is_ignored() {
        let reply = "Here you go:\n{\"verdict\":\"correct\",\"marksAwarded\":2,\"feedback\":\"Well done.\"}\nHope that helps {student}!";
        let eval = interpret(reply, &data(None)).unwrap();
        assert_eq!(eval.evaluation, "Good job, you scored 2/2 marks. Well done.");
    }

    #[test]
    fn unusable_verdict_object_is_stripped_from_free_text() {
        let reply = r#"{"verdict":"maybe","marksAwarded":1,"feedback":"The answer is partially right."}"#;
        let eval = interpret(reply, &data(None)).unwrap();
        assert_eq!(eval.evaluation, "Oh no, The answer is partially right.");
        assert!(!eval.evaluation.contains('{'));
        assert_eq!(eval.verdict, None);
    }

    #[test]
    fn free_text_is_sanitised_and_gets_a_sentinel() {
        let reply = "Evaluation: Your answer is wrong because the sign flipped.\nQuestion: Solve 2x = 10\n```\n";
        let eval = interpret(reply, &data(Some("https://videos.test/q1"))).unwrap();
        assert!(eval.evaluation.starts_with("Oh no, Your answer is wrong"));
        assert!(!eval.evaluation.contains("Question:"));
        assert!(!eval.evaluation.contains("```"));
        assert!(eval.evaluation.contains("Watch the video explanation"));
        assert_eq!(eval.verdict, None);
    }

    #[test]
    fn free_text_keeps_an_existing_sentinel() {
        let eval = interpret("Good job, that is right.", &data(None)).unwrap();
        assert_eq!(eval.evaluation, "Good job, that is right.");
        let eval = interpret("Nicely reasoned.", &data(None)).unwrap();
        assert_eq!(eval.evaluation, "Good job, Nicely reasoned.");
    }

    #[test]
    fn reply_that_is_only_noise_is_an_error() {
        let err = interpret("```\nQuestion: Solve 2x = 10\n```", &data(None)).unwrap_err();
        assert!(matches!(err, AppError::Llm(ProviderError::BadResponse(_))));
    }

    #[test]
    fn question_data_accepts_aliases() {
        let d: QuestionData = serde_json::from_value(serde_json::json!({
            "questionText": "Define osmosis",
            "userAnswer": "Movement of water",
            "maxMarks": 3
        }))
        .unwrap();
        assert_eq!(d.marks, 3);
        assert_eq!(d.student_answer, "Movement of water");
        d.validate().unwrap();
    }

    #[tokio::test]
    async fn evaluate_rejects_blank_answers_before_calling_providers() {
        let chain = ProviderChain::new(vec![LlmProvider::Dummy(DummyProvider::replying("unused"))]);
        let mut d = data(None);
        d.student_answer = "   ".into();
        let err = evaluate_answer(&chain, Path::new("/nonexistent"), &d).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn evaluate_without_providers_is_not_configured() {
        let err = evaluate_answer(&ProviderChain::default(), Path::new("/nonexistent"), &data(None))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no AI API keys configured");
    }
}
