//! Summarization backed by the chat model, with a local extractive mode.
//!
//! ## Algorithm (extractive)
//!
//! 1. Split the text into sentences
//! 2. Group sentences into parts of at most `PART_CHARS` characters
//! 3. Within each part, score every sentence by the average corpus frequency
//!    of its content words
//! 4. Keep the `sentence_cap` best sentences overall, in original order

use crate::error::{LlmError, Result};
use crate::openai::{ChatMessage, CompletionParams, OpenAiChatClient};
use crate::prompts;
use crate::traits::TextSummarization;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Largest piece of text analyzed (or sent for summary) at once
pub const PART_CHARS: usize = 2000;

const MIN_WORD_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "his", "her", "their", "they",
    "them", "its", "has", "have", "had", "was", "were", "are", "but", "not", "who", "into",
    "when", "which", "while", "after", "before", "then", "than", "also", "there", "where",
];

/// `TextSummarization` over an optional chat client.
///
/// Without a client, `abstractive` is `Unsupported` and callers fall back to
/// the local extractive summary.
#[derive(Debug, Clone, Default)]
pub struct ChatSummarizer {
    chat: Option<OpenAiChatClient>,
}

impl ChatSummarizer {
    pub fn new(chat: OpenAiChatClient) -> Self {
        Self { chat: Some(chat) }
    }

    /// Summarizer with no model behind it: extractive only
    pub fn extractive_only() -> Self {
        Self { chat: None }
    }
}

#[async_trait]
impl TextSummarization for ChatSummarizer {
    async fn abstractive(&self, text: &str, sentence_cap: usize) -> Result<String> {
        let chat = self
            .chat
            .as_ref()
            .ok_or(LlmError::Unsupported("abstractive summarization"))?;

        let parts = split_parts(text, PART_CHARS);
        if parts.is_empty() {
            return Err(LlmError::Service("nothing to summarize".to_string()));
        }
        let cap = sentence_cap.max(1);
        let budgets = part_budgets(cap, parts.len());
        debug!(
            "Abstractive summary of {} chars in {} parts",
            text.len(),
            parts.len()
        );

        let mut summaries = Vec::with_capacity(parts.len());
        for (part, &budget) in parts.into_iter().zip(&budgets) {
            summaries.push(summarize_once(chat, &part, budget).await?);
        }
        let joined = summaries.join(" ");

        // More parts than sentences: one sentence per part overshoots the cap
        if budgets.iter().sum::<usize>() > cap {
            debug!("Condensing {} part summaries to {} sentences", summaries.len(), cap);
            return summarize_once(chat, &joined, cap).await;
        }
        Ok(joined)
    }

    async fn extractive(&self, text: &str, sentence_cap: usize) -> Result<String> {
        extractive_summary(text, sentence_cap)
    }
}

async fn summarize_once(chat: &OpenAiChatClient, text: &str, sentence_cap: usize) -> Result<String> {
    let messages = [
        ChatMessage::system(prompts::summary_system(sentence_cap)),
        ChatMessage::user(text),
    ];
    chat.complete(&messages, CompletionParams::SUMMARY).await
}

/// Sentences requested from each part.
///
/// Splits `sentence_cap` as evenly as possible, earlier parts taking the
/// remainder. Every part asks for at least one sentence, so the total only
/// exceeds the cap when there are more parts than sentences.
fn part_budgets(sentence_cap: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return Vec::new();
    }
    let base = sentence_cap / parts;
    let extra = sentence_cap % parts;
    (0..parts)
        .map(|i| (base + usize::from(i < extra)).max(1))
        .collect()
}

/// Local extractive summary, see the module docs
pub fn extractive_summary(text: &str, sentence_cap: usize) -> Result<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Err(LlmError::Service("nothing to summarize".to_string()));
    }
    let cap = sentence_cap.max(1);
    if sentences.len() <= cap {
        return Ok(sentences.join(" "));
    }

    // (position, score) for every sentence, scored within its own part
    let mut scored: Vec<(usize, f64)> = Vec::with_capacity(sentences.len());
    let mut position = 0;
    for part in group_sentences(&sentences, PART_CHARS) {
        let frequencies = word_frequencies(part);
        for sentence in part {
            scored.push((position, sentence_score(sentence, &frequencies)));
            position += 1;
        }
    }

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(cap);
    scored.sort_by_key(|(pos, _)| *pos);

    Ok(scored
        .into_iter()
        .map(|(pos, _)| sentences[pos])
        .collect::<Vec<_>>()
        .join(" "))
}

/// Split on `.`, `!` or `?` followed by whitespace
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let ends_sentence = matches!(chars.peek(), Some((_, next)) if next.is_whitespace());
        if ends_sentence {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Greedily pack sentences into groups of at most `max_chars`.
/// A single oversized sentence forms its own group.
fn group_sentences<'a, 'b>(sentences: &'b [&'a str], max_chars: usize) -> Vec<&'b [&'a str]> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut len = 0;

    for (i, sentence) in sentences.iter().enumerate() {
        let added = sentence.chars().count() + 1;
        if i > start && len + added > max_chars {
            groups.push(&sentences[start..i]);
            start = i;
            len = 0;
        }
        len += added;
    }
    if start < sentences.len() {
        groups.push(&sentences[start..]);
    }
    groups
}

fn split_parts(text: &str, max_chars: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    group_sentences(&sentences, max_chars)
        .into_iter()
        .map(|group| group.join(" "))
        .collect()
}

fn content_words(sentence: &str) -> impl Iterator<Item = String> + '_ {
    sentence
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}

fn word_frequencies(sentences: &[&str]) -> HashMap<String, usize> {
    let mut frequencies = HashMap::new();
    for sentence in sentences {
        for word in content_words(sentence) {
            *frequencies.entry(word).or_insert(0) += 1;
        }
    }
    frequencies
}

fn sentence_score(sentence: &str, frequencies: &HashMap<String, usize>) -> f64 {
    let (total, count) = content_words(sentence).fold((0usize, 0usize), |(total, count), word| {
        (total + frequencies.get(&word).copied().unwrap_or(0), count + 1)
    });
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}
