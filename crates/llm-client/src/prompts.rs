//! Prompt texts sent to the chat model.
//!
//! Boolean prompts ask for a bare `true`/`false` so the reply can be parsed
//! strictly; see [`crate::parse_boolean`].

/// Does the message concern movies at all?
pub const INTENT_SYSTEM: &str =
    "Determine if the user is trying to discuss movies. Respond with 'true' or 'false' only.";

/// Does the new query continue the subject of the conversation so far?
pub const CONTINUATION_SYSTEM: &str = "You are a context analyzer. Your ONLY task is to determine \
if the user's query relates to the subject matter of the provided conversation. \
You must ONLY respond with the word 'true' or 'false'. \
Do not provide explanations or additional text.";

/// Can this plot section on its own answer the question?
pub const RELEVANCE_SYSTEM: &str = "You are a plot section analyzer. Decide whether the plot \
section below contains enough information, on its own, to answer the user's question. \
You must ONLY respond with the word 'true' or 'false'.";

pub const NAME_EXTRACTION_SYSTEM: &str = "Extract the movie names mentioned in the user's message. \
If several movies are mentioned, list them separated by commas in the order they appear. \
If no movie is mentioned, respond with an empty string.";

pub const ABSTRACTIVE_SUMMARY_SYSTEM: &str =
    "Summarize the following movie plot. Keep names and key events. Do not add information.";

const ANSWER_SYSTEM: &str = "You are a movie assistant. ONLY use the provided context to answer questions. \
If the context doesn't contain enough information to answer, say so. \
Do not use any external knowledge or training data. \
Context: ";

/// Marks where the plot section starts inside a relevance prompt
pub const PLOT_SECTION_MARKER: &str = "Plot section:\n";

/// Marks where the conversation starts inside intent and continuation prompts
pub const CONVERSATION_MARKER: &str = "Conversation so far:\n";

pub fn answer_system(context: &str) -> String {
    format!("{}{}", ANSWER_SYSTEM, context)
}

pub fn summary_system(sentence_cap: usize) -> String {
    format!(
        "{} Use at most {} sentences.",
        ABSTRACTIVE_SUMMARY_SYSTEM, sentence_cap
    )
}

pub fn relevance_prompt(query: &str, chunk: &str) -> String {
    format!("Question: {}\n\n{}{}", query, PLOT_SECTION_MARKER, chunk)
}

/// Intent prompt; the conversation is only included when there is one
pub fn intent_prompt(query: &str, history_text: &str) -> String {
    if history_text.trim().is_empty() {
        query.to_string()
    } else {
        format!(
            "{}{}\n\nMessage: {}",
            CONVERSATION_MARKER, history_text, query
        )
    }
}

pub fn continuation_prompt(query: &str, history_text: &str) -> String {
    format!("{}{}\n\nQuery: {}", CONVERSATION_MARKER, history_text, query)
}
