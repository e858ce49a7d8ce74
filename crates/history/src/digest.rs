//! Short plain-text digest of a conversation.

use crate::types::{Role, Turn};

/// Turns considered when listing recent topics
const RECENT_WINDOW: usize = 5;

/// Longest topic snippet before it is cut with "..."
const TOPIC_CHARS: usize = 50;

/// `"Conversation contains N messages. Recent topics discussed: a, b"`.
///
/// Topics are the user turns among the last few turns, each cut to a short
/// snippet.
pub fn digest(turns: &[Turn]) -> String {
    let start = turns.len().saturating_sub(RECENT_WINDOW);
    let topics: Vec<String> = turns[start..]
        .iter()
        .filter(|t| t.role == Role::User && !t.content.trim().is_empty())
        .map(|t| snippet(t.content.trim()))
        .collect();

    let topics = if topics.is_empty() {
        "none".to_string()
    } else {
        topics.join(", ")
    };

    format!(
        "Conversation contains {} messages. Recent topics discussed: {}",
        turns.len(),
        topics
    )
}

fn snippet(content: &str) -> String {
    if content.chars().count() > TOPIC_CHARS {
        let cut: String = content.chars().take(TOPIC_CHARS).collect();
        format!("{}...", cut)
    } else {
        content.to_string()
    }
}
