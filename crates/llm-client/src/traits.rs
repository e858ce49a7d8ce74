//! Collaborator traits the pipeline is written against.
//!
//! Both traits are object safe (via `async_trait`) so the orchestrator can hold
//! `Arc<dyn ChatCompletion>` and tests can swap in scripted fakes.

use crate::error::{LlmError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Chat-model operations used by the context pipeline
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Deterministic (temperature 0) yes/no classification.
    ///
    /// Output that is not a boolean token is `Err(LlmError::MalformedOutput)`;
    /// each call site decides what that means.
    async fn classify_boolean(&self, system_prompt: &str, user_prompt: &str) -> Result<bool>;

    /// Movie names mentioned in `prompt`, comma separated. May be empty.
    async fn extract_names(&self, prompt: &str) -> Result<String>;

    /// Final answer to `query`, grounded only in `context`
    async fn generate_answer(&self, query: &str, context: &str) -> Result<String>;
}

/// Summarization backends.
///
/// Either operation may fail with `Unsupported` or `Service`.
#[async_trait]
pub trait TextSummarization: Send + Sync {
    async fn abstractive(&self, text: &str, sentence_cap: usize) -> Result<String>;

    async fn extractive(&self, text: &str, sentence_cap: usize) -> Result<String>;
}

#[async_trait]
impl<T: ChatCompletion + ?Sized> ChatCompletion for Arc<T> {
    async fn classify_boolean(&self, system_prompt: &str, user_prompt: &str) -> Result<bool> {
        (**self).classify_boolean(system_prompt, user_prompt).await
    }

    async fn extract_names(&self, prompt: &str) -> Result<String> {
        (**self).extract_names(prompt).await
    }

    async fn generate_answer(&self, query: &str, context: &str) -> Result<String> {
        (**self).generate_answer(query, context).await
    }
}

#[async_trait]
impl<T: TextSummarization + ?Sized> TextSummarization for Arc<T> {
    async fn abstractive(&self, text: &str, sentence_cap: usize) -> Result<String> {
        (**self).abstractive(text, sentence_cap).await
    }

    async fn extractive(&self, text: &str, sentence_cap: usize) -> Result<String> {
        (**self).extractive(text, sentence_cap).await
    }
}

/// Strictly parse a boolean reply.
///
/// Accepts `true`/`false` (and `yes`/`no`), any case, optionally quoted or
/// followed by a period. Anything else is malformed.
pub fn parse_boolean(raw: &str) -> Result<bool> {
    let mut token = raw;
    loop {
        let stripped = token
            .trim()
            .trim_matches(|c| c == '\'' || c == '"' || c == '`')
            .trim_end_matches('.');
        if stripped == token {
            break;
        }
        token = stripped;
    }
    let token = token.to_ascii_lowercase();

    match token.as_str() {
        "true" | "yes" => Ok(true),
        "false" | "no" => Ok(false),
        _ => Err(LlmError::MalformedOutput(raw.to_string())),
    }
}

/// Split comma separated extraction output into clean names, in order
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n')
        .map(|name| {
            name.trim()
                .trim_matches(|c| c == '"' || c == '\'' || c == '*')
                .trim()
        })
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boolean_accepts_common_forms() {
        assert!(parse_boolean("true").unwrap());
        assert!(parse_boolean("  'True'. ").unwrap());
        assert!(parse_boolean("YES").unwrap());
        assert!(!parse_boolean("false").unwrap());
        assert!(!parse_boolean("\"no\"").unwrap());
    }

    #[test]
    fn test_parse_boolean_quoted_with_period() {
        assert!(parse_boolean("\"True\".").unwrap());
        assert!(!parse_boolean("'false'.").unwrap());
        assert!(parse_boolean(" `yes.` ").unwrap());
        assert!(!parse_boolean("\"No.\"\n").unwrap());
    }

    #[test]
    fn test_parse_boolean_rejects_prose() {
        assert!(matches!(
            parse_boolean("I think it is true"),
            Err(LlmError::MalformedOutput(_))
        ));
        assert!(matches!(parse_boolean(""), Err(LlmError::MalformedOutput(_))));
    }

    #[test]
    fn test_split_names() {
        assert_eq!(
            split_names(" \"Inception\", The Matrix ,, "),
            vec!["Inception".to_string(), "The Matrix".to_string()]
        );
        assert!(split_names("   ").is_empty());
    }
}
