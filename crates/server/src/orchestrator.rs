//! # Query Orchestrator
//!
//! Runs one question through the pipeline:
//! 1. Load the user's recent history (empty when the store cannot be read)
//! 2. Check intent for fresh conversations; off-topic questions get the
//!    redirect message and nothing else
//! 3. Build the context (single movie, similar movies or conversation)
//! 4. Generate the answer
//! 5. Persist the user turn, then the assistant turn
//!
//! The whole run is bounded by the configured timeout and can be cancelled.
//! Either way the run is dropped at its next await point, so no later stage
//! starts from a half-finished one.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use catalog::MovieCatalog;
use history::{ConversationStore, Role, StoreError};
use llm_client::{ChatCompletion, LlmError, TextSummarization};
use pipeline::{ContextDocument, ContextSelector, IntentClassifier};

use crate::config::OrchestratorConfig;

/// Last stage a run completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum QueryStage {
    Start = 0,
    HistoryLoaded = 1,
    IntentChecked = 2,
    ContextBuilt = 3,
    AnswerGenerated = 4,
    Persisted = 5,
}

impl QueryStage {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => QueryStage::HistoryLoaded,
            2 => QueryStage::IntentChecked,
            3 => QueryStage::ContextBuilt,
            4 => QueryStage::AnswerGenerated,
            5 => QueryStage::Persisted,
            _ => QueryStage::Start,
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryStage::Start => "start",
            QueryStage::HistoryLoaded => "history-loaded",
            QueryStage::IntentChecked => "intent-checked",
            QueryStage::ContextBuilt => "context-built",
            QueryStage::AnswerGenerated => "answer-generated",
            QueryStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Progress of one run, readable after the run itself was dropped
#[derive(Debug, Default)]
struct StageTracker(AtomicU8);

impl StageTracker {
    fn advance(&self, stage: QueryStage) {
        self.0.store(stage as u8, Ordering::Release);
    }

    fn current(&self) -> QueryStage {
        QueryStage::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Terminal failure of a run
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("conversation store unavailable after stage {stage} ({elapsed:?})")]
    StoreUnavailable {
        stage: QueryStage,
        elapsed: Duration,
        #[source]
        source: StoreError,
    },

    #[error("answer generation failed after stage {stage} ({elapsed:?})")]
    GenerationFailure {
        stage: QueryStage,
        elapsed: Duration,
        #[source]
        source: LlmError,
    },

    #[error("query timed out after stage {stage} ({elapsed:?})")]
    TimedOut { stage: QueryStage, elapsed: Duration },

    #[error("query cancelled after stage {stage} ({elapsed:?})")]
    Cancelled { stage: QueryStage, elapsed: Duration },
}

impl QueryError {
    /// Last stage completed before the failure
    pub fn stage(&self) -> QueryStage {
        match self {
            QueryError::StoreUnavailable { stage, .. }
            | QueryError::GenerationFailure { stage, .. }
            | QueryError::TimedOut { stage, .. }
            | QueryError::Cancelled { stage, .. } => *stage,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            QueryError::StoreUnavailable { elapsed, .. }
            | QueryError::GenerationFailure { elapsed, .. }
            | QueryError::TimedOut { elapsed, .. }
            | QueryError::Cancelled { elapsed, .. } => *elapsed,
        }
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub response_text: String,
    /// Empty for redirected (off-topic) queries
    pub context_used: ContextDocument,
    pub elapsed: Duration,
}

/// Coordinates history, intent, context and answer generation for one user
/// question at a time. Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct QueryOrchestrator {
    chat: Arc<dyn ChatCompletion>,
    store: Arc<dyn ConversationStore>,
    intent: Arc<IntentClassifier>,
    selector: Arc<ContextSelector>,
    config: Arc<OrchestratorConfig>,
}

impl QueryOrchestrator {
    pub fn new(
        chat: Arc<dyn ChatCompletion>,
        catalog: Arc<dyn MovieCatalog>,
        summarizer: Arc<dyn TextSummarization>,
        store: Arc<dyn ConversationStore>,
        config: OrchestratorConfig,
    ) -> Self {
        let intent = IntentClassifier::new(chat.clone());
        let selector = ContextSelector::new(chat.clone(), catalog, summarizer, &config.context);

        Self {
            chat,
            store,
            intent: Arc::new(intent),
            selector: Arc::new(selector),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Answer `query` for `user_id`, bounded by the configured timeout
    pub async fn process_query(
        &self,
        user_id: &str,
        query: &str,
    ) -> Result<QueryResult, QueryError> {
        self.process_query_until(user_id, query, std::future::pending())
            .await
    }

    /// Like `process_query`, but gives up as soon as `cancel` resolves
    #[instrument(skip(self, query, cancel), fields(query_len = query.len()))]
    pub async fn process_query_until<C>(
        &self,
        user_id: &str,
        query: &str,
        cancel: C,
    ) -> Result<QueryResult, QueryError>
    where
        C: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let tracker = StageTracker::default();
        info!("Processing query for user {}: {}", user_id, query);

        let run = tokio::time::timeout(
            self.config.request_timeout,
            self.run(user_id, query, &tracker, start_time),
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel => Err(QueryError::Cancelled {
                stage: tracker.current(),
                elapsed: start_time.elapsed(),
            }),
            finished = run => match finished {
                Ok(result) => result,
                Err(_) => Err(QueryError::TimedOut {
                    stage: tracker.current(),
                    elapsed: start_time.elapsed(),
                }),
            },
        };

        if let Err(e) = &outcome {
            error!(
                stage = %e.stage(),
                "Query for user {} failed after {:.2}ms: {}",
                user_id,
                e.elapsed().as_secs_f64() * 1000.0,
                e
            );
        }
        outcome
    }

    async fn run(
        &self,
        user_id: &str,
        query: &str,
        tracker: &StageTracker,
        start_time: Instant,
    ) -> Result<QueryResult, QueryError> {
        // History
        let step = Instant::now();
        let history = match self.store.recent(user_id).await {
            Ok(turns) => turns,
            Err(e) => {
                warn!("History read failed, treating as a fresh conversation: {}", e);
                Vec::new()
            }
        };
        let follow_up = !history.is_empty();
        tracker.advance(QueryStage::HistoryLoaded);
        info!(
            "History loaded in {:.2}ms. Turns: {}, follow-up: {}",
            ms(step),
            history.len(),
            follow_up
        );

        // Intent
        if follow_up && self.config.skip_intent_on_followup {
            debug!("Follow-up question, intent check skipped");
        } else {
            let step = Instant::now();
            let on_topic = self.intent.is_on_topic(query, &history).await;
            info!("Intent checked in {:.2}ms. On topic: {}", ms(step), on_topic);

            if !on_topic {
                let elapsed = start_time.elapsed();
                info!(
                    "Off-topic query redirected after {:.2}ms",
                    elapsed.as_secs_f64() * 1000.0
                );
                return Ok(QueryResult {
                    response_text: self.config.redirect_message.clone(),
                    context_used: ContextDocument::empty(),
                    elapsed,
                });
            }
        }
        tracker.advance(QueryStage::IntentChecked);

        // Context
        let step = Instant::now();
        let context = self.selector.build_context(query, &history).await;
        tracker.advance(QueryStage::ContextBuilt);
        info!(
            "Context built in {:.2}ms. Kind: {}, length: {} chars",
            ms(step),
            context.kind,
            context.len()
        );

        // Answer
        let step = Instant::now();
        let response_text = self
            .chat
            .generate_answer(query, &context.text)
            .await
            .map_err(|source| QueryError::GenerationFailure {
                stage: tracker.current(),
                elapsed: start_time.elapsed(),
                source,
            })?;
        tracker.advance(QueryStage::AnswerGenerated);
        info!(
            "Answer generated in {:.2}ms. Length: {} chars",
            ms(step),
            response_text.len()
        );

        // Persist
        for (role, content) in [(Role::User, query), (Role::Assistant, response_text.as_str())] {
            self.store
                .append(user_id, role, content)
                .await
                .map_err(|source| QueryError::StoreUnavailable {
                    stage: tracker.current(),
                    elapsed: start_time.elapsed(),
                    source,
                })?;
        }
        tracker.advance(QueryStage::Persisted);

        let elapsed = start_time.elapsed();
        info!(
            "Query for user {} completed in {:.2}ms",
            user_id,
            elapsed.as_secs_f64() * 1000.0
        );

        Ok(QueryResult {
            response_text,
            context_used: context,
            elapsed,
        })
    }
}

fn ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tracker() {
        let tracker = StageTracker::default();
        assert_eq!(tracker.current(), QueryStage::Start);

        tracker.advance(QueryStage::ContextBuilt);
        assert_eq!(tracker.current(), QueryStage::ContextBuilt);

        tracker.advance(QueryStage::Persisted);
        assert_eq!(tracker.current(), QueryStage::Persisted);
    }

    #[test]
    fn test_stage_order_and_names() {
        assert!(QueryStage::Start < QueryStage::HistoryLoaded);
        assert!(QueryStage::AnswerGenerated < QueryStage::Persisted);
        assert_eq!(QueryStage::IntentChecked.to_string(), "intent-checked");
    }

    #[test]
    fn test_error_accessors() {
        let err = QueryError::TimedOut {
            stage: QueryStage::ContextBuilt,
            elapsed: Duration::from_millis(40),
        };
        assert_eq!(err.stage(), QueryStage::ContextBuilt);
        assert_eq!(err.elapsed(), Duration::from_millis(40));
        assert!(err.to_string().contains("context-built"));
    }
}
