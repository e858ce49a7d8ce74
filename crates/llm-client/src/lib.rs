//! Language model client for the movie Q&A pipeline.
//!
//! This crate provides:
//! - The `ChatCompletion` and `TextSummarization` traits the pipeline uses
//! - `OpenAiChatClient`, an HTTP client for OpenAI-compatible endpoints
//! - `ChatSummarizer`, abstractive summaries through the chat model plus a
//!   local extractive fallback
//! - Prompt texts and strict parsing of boolean replies
//! - Scripted fakes for tests (`fakes`, behind the `test-util` feature)

pub mod error;
pub mod openai;
pub mod prompts;
pub mod summarizer;
pub mod traits;

#[cfg(any(test, feature = "test-util"))]
pub mod fakes;

pub use error::{LlmError, Result};
pub use openai::{ChatMessage, CompletionParams, OpenAiChatClient};
pub use summarizer::{extractive_summary, ChatSummarizer};
pub use traits::{parse_boolean, split_names, ChatCompletion, TextSummarization};
