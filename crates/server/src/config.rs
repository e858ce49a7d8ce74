//! Orchestrator settings.

use pipeline::ContextConfig;
use std::time::Duration;

/// Reply for off-topic questions in a fresh conversation
pub const DEFAULT_REDIRECT: &str =
    "I'm a movie assistant. Could you ask me something about movies?";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Skip the intent check when the user already has history
    pub skip_intent_on_followup: bool,
    /// Upper bound for one whole run
    pub request_timeout: Duration,
    pub redirect_message: String,
    pub context: ContextConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            skip_intent_on_followup: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            redirect_message: DEFAULT_REDIRECT.to_string(),
            context: ContextConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_intent_on_followup(mut self, skip: bool) -> Self {
        self.skip_intent_on_followup = skip;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_redirect_message(mut self, message: impl Into<String>) -> Self {
        self.redirect_message = message.into();
        self
    }

    pub fn with_context(mut self, context: ContextConfig) -> Self {
        self.context = context;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert!(config.skip_intent_on_followup);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.redirect_message, DEFAULT_REDIRECT);
        assert_eq!(config.context.similar_limit, 3);
    }

    #[test]
    fn test_builder() {
        let config = OrchestratorConfig::new()
            .with_skip_intent_on_followup(false)
            .with_request_timeout(Duration::from_millis(250))
            .with_redirect_message("movies only");

        assert!(!config.skip_intent_on_followup);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.redirect_message, "movies only");
    }
}
