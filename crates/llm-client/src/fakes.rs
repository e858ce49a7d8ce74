//! Scripted collaborators for tests.
//!
//! Compiled for this crate's own tests and, through the `test-util` feature,
//! for the tests of crates that depend on it.

use crate::error::{LlmError, Result};
use crate::prompts;
use crate::summarizer::split_sentences;
use crate::traits::{ChatCompletion, TextSummarization};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// Which kind of request a `ScriptedChat` received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCall {
    Intent,
    Continuation,
    Relevance,
    Extraction,
    Answer,
    Other,
}

#[derive(Debug, Clone, Copy)]
enum Verdict {
    Reply(bool),
    Garbled,
    Fail,
}

impl Verdict {
    fn resolve(self) -> Result<bool> {
        match self {
            Verdict::Reply(value) => Ok(value),
            Verdict::Garbled => Err(LlmError::MalformedOutput("maybe?".to_string())),
            Verdict::Fail => Err(LlmError::Service("scripted failure".to_string())),
        }
    }
}

/// Chat model with scripted, prompt-driven answers.
///
/// - intent and continuation checks reply with a fixed verdict
/// - a plot section is relevant when it contains one of the configured markers
/// - extraction returns the known titles found in the prompt, ordered by
///   their last mention
/// - answers echo the query and record the context they were given
#[derive(Debug)]
pub struct ScriptedChat {
    on_topic: Verdict,
    related: Verdict,
    relevance_fails: bool,
    relevant_markers: Vec<String>,
    known_titles: Vec<String>,
    extraction_fails: bool,
    answer_fails: bool,
    answer_delay: Option<Duration>,
    calls: Mutex<Vec<ChatCall>>,
    contexts: Mutex<Vec<String>>,
}

impl Default for ScriptedChat {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedChat {
    /// On-topic, unrelated to history, nothing relevant, no known titles
    pub fn new() -> Self {
        Self {
            on_topic: Verdict::Reply(true),
            related: Verdict::Reply(false),
            relevance_fails: false,
            relevant_markers: Vec::new(),
            known_titles: Vec::new(),
            extraction_fails: false,
            answer_fails: false,
            answer_delay: None,
            calls: Mutex::new(Vec::new()),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn on_topic(mut self, on_topic: bool) -> Self {
        self.on_topic = Verdict::Reply(on_topic);
        self
    }

    pub fn garbled_intent(mut self) -> Self {
        self.on_topic = Verdict::Garbled;
        self
    }

    pub fn failing_intent(mut self) -> Self {
        self.on_topic = Verdict::Fail;
        self
    }

    pub fn related(mut self, related: bool) -> Self {
        self.related = Verdict::Reply(related);
        self
    }

    pub fn failing_continuation(mut self) -> Self {
        self.related = Verdict::Fail;
        self
    }

    pub fn relevant_when(mut self, marker: impl Into<String>) -> Self {
        self.relevant_markers.push(marker.into());
        self
    }

    pub fn failing_relevance(mut self) -> Self {
        self.relevance_fails = true;
        self
    }

    pub fn knows_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_titles.extend(titles.into_iter().map(Into::into));
        self
    }

    pub fn failing_extraction(mut self) -> Self {
        self.extraction_fails = true;
        self
    }

    pub fn failing_answers(mut self) -> Self {
        self.answer_fails = true;
        self
    }

    pub fn answer_delay(mut self, delay: Duration) -> Self {
        self.answer_delay = Some(delay);
        self
    }

    /// Every request received so far, in order
    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self, kind: ChatCall) -> usize {
        self.calls().into_iter().filter(|c| *c == kind).count()
    }

    /// Contexts passed to `generate_answer`, in order
    pub fn answer_contexts(&self) -> Vec<String> {
        self.contexts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, call: ChatCall) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    fn judge_relevance(&self, user_prompt: &str) -> Result<bool> {
        if self.relevance_fails {
            return Err(LlmError::Service("scripted failure".to_string()));
        }
        let chunk = user_prompt
            .split_once(prompts::PLOT_SECTION_MARKER)
            .map(|(_, chunk)| chunk)
            .unwrap_or(user_prompt);
        Ok(self
            .relevant_markers
            .iter()
            .any(|marker| chunk.contains(marker.as_str())))
    }
}

#[async_trait]
impl ChatCompletion for ScriptedChat {
    async fn classify_boolean(&self, system_prompt: &str, user_prompt: &str) -> Result<bool> {
        match system_prompt {
            prompts::INTENT_SYSTEM => {
                self.record(ChatCall::Intent);
                self.on_topic.resolve()
            }
            prompts::CONTINUATION_SYSTEM => {
                self.record(ChatCall::Continuation);
                self.related.resolve()
            }
            prompts::RELEVANCE_SYSTEM => {
                self.record(ChatCall::Relevance);
                self.judge_relevance(user_prompt)
            }
            _ => {
                self.record(ChatCall::Other);
                Err(LlmError::MalformedOutput(String::new()))
            }
        }
    }

    async fn extract_names(&self, prompt: &str) -> Result<String> {
        self.record(ChatCall::Extraction);
        if self.extraction_fails {
            return Err(LlmError::Transport("scripted failure".to_string()));
        }

        let haystack = prompt.to_lowercase();
        let mut found: Vec<(usize, &str)> = self
            .known_titles
            .iter()
            .filter_map(|title| {
                haystack
                    .rfind(&title.to_lowercase())
                    .map(|pos| (pos, title.as_str()))
            })
            .collect();
        found.sort_by_key(|(pos, _)| *pos);

        Ok(found
            .into_iter()
            .map(|(_, title)| title)
            .collect::<Vec<_>>()
            .join(", "))
    }

    async fn generate_answer(&self, query: &str, context: &str) -> Result<String> {
        self.record(ChatCall::Answer);
        if let Some(delay) = self.answer_delay {
            tokio::time::sleep(delay).await;
        }
        if self.answer_fails {
            return Err(LlmError::Status {
                status: 503,
                body: "scripted failure".to_string(),
            });
        }
        self.contexts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(context.to_string());
        Ok(format!("Answer to: {}", query))
    }
}

/// How one summarization mode behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryBehavior {
    Works,
    Unsupported,
    Fails,
}

/// Summarizer that tags its output with the mode that produced it.
///
/// A working mode returns `"abstract: <first sentence>"` or
/// `"extract: <first sentence>"`.
#[derive(Debug)]
pub struct FakeSummarizer {
    abstractive: SummaryBehavior,
    extractive: SummaryBehavior,
    calls: Mutex<usize>,
}

impl FakeSummarizer {
    pub fn new(abstractive: SummaryBehavior, extractive: SummaryBehavior) -> Self {
        Self {
            abstractive,
            extractive,
            calls: Mutex::new(0),
        }
    }

    pub fn working() -> Self {
        Self::new(SummaryBehavior::Works, SummaryBehavior::Works)
    }

    /// Total calls across both modes
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn run(&self, behavior: SummaryBehavior, tag: &str, text: &str) -> Result<String> {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        match behavior {
            SummaryBehavior::Works => {
                let first = split_sentences(text).first().copied().unwrap_or("");
                Ok(format!("{}: {}", tag, first))
            }
            SummaryBehavior::Unsupported => Err(LlmError::Unsupported("scripted")),
            SummaryBehavior::Fails => Err(LlmError::Service("scripted failure".to_string())),
        }
    }
}

#[async_trait]
impl TextSummarization for FakeSummarizer {
    async fn abstractive(&self, text: &str, _sentence_cap: usize) -> Result<String> {
        self.run(self.abstractive, "abstract", text)
    }

    async fn extractive(&self, text: &str, _sentence_cap: usize) -> Result<String> {
        self.run(self.extractive, "extract", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extraction_orders_by_last_mention() {
        let chat = ScriptedChat::new().knows_titles(["Inception", "Heat"]);
        let names = chat
            .extract_names("user: Heat was great\nuser: now Inception\nuser: back to heat")
            .await
            .unwrap();
        assert_eq!(names, "Inception, Heat");
        assert_eq!(chat.count(ChatCall::Extraction), 1);
    }

    #[tokio::test]
    async fn test_relevance_only_looks_at_the_section() {
        let chat = ScriptedChat::new().relevant_when("spinning top");
        let prompt = prompts::relevance_prompt("what about the spinning top?", "Cobb wakes up.");
        assert!(!chat
            .classify_boolean(prompts::RELEVANCE_SYSTEM, &prompt)
            .await
            .unwrap());
    }
}
