//! Layered prompt builder for the tutor routes.
//!
//! A prompt is a stack of template fragments joined by blank lines. Each named
//! layer is read from the configured prompts directory when the file exists
//! there, otherwise from the copy compiled into the binary, so a deployment
//! can restyle the tutor without a rebuild.
//!
//! Variable substitution uses `{{key}}` syntax and is applied once at
//! [`build()`](PromptBuilder::build) time, after all layers are joined.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

const SEPARATOR: &str = "\n\n";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").unwrap());

pub const PERSONA: &str = "tutor_persona.md";
pub const EVALUATE: &str = "evaluate_answer.md";
pub const CHAT_CONTEXT: &str = "chat_context.md";

const BUILTIN: &[(&str, &str)] = &[
    (PERSONA, include_str!("../../config/prompts/tutor_persona.md")),
    (EVALUATE, include_str!("../../config/prompts/evaluate_answer.md")),
    (CHAT_CONTEXT, include_str!("../../config/prompts/chat_context.md")),
];

fn builtin(name: &str) -> Option<&'static str> {
    BUILTIN.iter().find(|(n, _)| *n == name).map(|(_, text)| *text)
}

pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append the named layer: the override file if present, else the
    /// built-in text. Unknown names with no file are skipped.
    pub fn layer(mut self, filename: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(_) => {
                trace!(path = %path.display(), "prompt override not found, using built-in");
                builtin(filename).map(str::to_string)
            }
        };
        match text {
            Some(text) => self.append(text),
            None => self,
        }
    }

    /// Directly append a text fragment.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
        self
    }

    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Join all layers with blank lines and apply variable substitution.
    ///
    /// Substituted values are not rescanned. Placeholders with no matching
    /// variable are left as they are.
    pub fn build(self) -> String {
        let prompt = self.parts.join(SEPARATOR);
        PLACEHOLDER
            .replace_all(&prompt, |caps: &Captures<'_>| match self.vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
