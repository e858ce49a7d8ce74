//! Two-tier plot summaries: abstractive first, extractive second, raw text
//! last. Never returns an empty string for non-empty input.

use llm_client::{LlmError, TextSummarization};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct TwoTierSummarizer {
    backend: Arc<dyn TextSummarization>,
    sentence_cap: usize,
}

impl TwoTierSummarizer {
    pub fn new(backend: Arc<dyn TextSummarization>, sentence_cap: usize) -> Self {
        Self {
            backend,
            sentence_cap: sentence_cap.max(1),
        }
    }

    pub async fn summarize(&self, text: &str) -> String {
        match self.backend.abstractive(text, self.sentence_cap).await {
            Ok(summary) if !summary.trim().is_empty() => return summary,
            Ok(_) => debug!("Abstractive summary was empty"),
            Err(LlmError::Unsupported(op)) => debug!("{} unsupported, trying extractive", op),
            Err(e) => warn!("Abstractive summary failed: {}", e),
        }

        match self.backend.extractive(text, self.sentence_cap).await {
            Ok(summary) if !summary.trim().is_empty() => return summary,
            Ok(_) => debug!("Extractive summary was empty"),
            Err(e) => warn!("Extractive summary failed, using source text: {}", e),
        }

        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::fakes::{FakeSummarizer, SummaryBehavior};

    const PLOT: &str = "Marines fight aliens. Ripley survives.";

    async fn run(abstractive: SummaryBehavior, extractive: SummaryBehavior) -> String {
        let backend = Arc::new(FakeSummarizer::new(abstractive, extractive));
        TwoTierSummarizer::new(backend, 15).summarize(PLOT).await
    }

    #[tokio::test]
    async fn test_abstractive_preferred() {
        let summary = run(SummaryBehavior::Works, SummaryBehavior::Works).await;
        assert_eq!(summary, "abstract: Marines fight aliens.");
    }

    #[tokio::test]
    async fn test_extractive_fallback() {
        let unsupported = run(SummaryBehavior::Unsupported, SummaryBehavior::Works).await;
        assert_eq!(unsupported, "extract: Marines fight aliens.");

        let failing = run(SummaryBehavior::Fails, SummaryBehavior::Works).await;
        assert_eq!(failing, "extract: Marines fight aliens.");
    }

    #[tokio::test]
    async fn test_total_failure_returns_source() {
        let summary = run(SummaryBehavior::Fails, SummaryBehavior::Unsupported).await;
        assert_eq!(summary, PLOT);
    }
}
