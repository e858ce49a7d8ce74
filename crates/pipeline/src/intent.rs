//! Intent classification: is the user talking about movies at all?

use history::{Turn, render_turns};
use llm_client::{ChatCompletion, prompts};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct IntentClassifier {
    chat: Arc<dyn ChatCompletion>,
}

impl IntentClassifier {
    pub fn new(chat: Arc<dyn ChatCompletion>) -> Self {
        Self { chat }
    }

    /// True when `query` concerns movies.
    ///
    /// Any error or non-boolean reply counts as on-topic.
    pub async fn is_on_topic(&self, query: &str, history: &[Turn]) -> bool {
        let prompt = prompts::intent_prompt(query, &render_turns(history));
        match self
            .chat
            .classify_boolean(prompts::INTENT_SYSTEM, &prompt)
            .await
        {
            Ok(on_topic) => {
                debug!(on_topic, "Intent classified");
                on_topic
            }
            Err(e) => {
                warn!("Intent check failed, treating query as on-topic: {}", e);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::fakes::ScriptedChat;

    #[tokio::test]
    async fn test_reply_is_used() {
        let chat = Arc::new(ScriptedChat::new().on_topic(false));
        assert!(!IntentClassifier::new(chat).is_on_topic("weather?", &[]).await);
    }

    #[tokio::test]
    async fn test_garbled_or_failed_defaults_to_on_topic() {
        let garbled = Arc::new(ScriptedChat::new().garbled_intent());
        assert!(IntentClassifier::new(garbled).is_on_topic("hmm", &[]).await);

        let failing = Arc::new(ScriptedChat::new().failing_intent());
        assert!(IntentClassifier::new(failing).is_on_topic("hmm", &[]).await);
    }
}
