//! Movie resolution: which single movie, if any, is this turn about?
//!
//! ## Algorithm
//! 1. With history, ask whether the query continues the conversation
//! 2. Extract names from the query alone, or from every stored turn plus the
//!    query when it does continue the conversation
//! 3. The last extracted name wins
//! 4. Look it up; only a record with a plot counts as resolved
//!
//! Every failure along the way means "no movie", never an error: the
//! selector simply moves on to its next strategy.

use catalog::{MovieCatalog, MovieRecord};
use history::{Turn, render_turns};
use llm_client::{ChatCompletion, prompts, split_names};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct MovieResolver {
    chat: Arc<dyn ChatCompletion>,
    catalog: Arc<dyn MovieCatalog>,
}

impl MovieResolver {
    pub fn new(chat: Arc<dyn ChatCompletion>, catalog: Arc<dyn MovieCatalog>) -> Self {
        Self { chat, catalog }
    }

    #[instrument(skip(self, history), fields(history_len = history.len()))]
    pub async fn resolve(&self, query: &str, history: &[Turn]) -> Option<MovieRecord> {
        let follow_up = !history.is_empty() && self.continues_conversation(query, history).await;

        let source_text = if follow_up {
            let mut text = history
                .iter()
                .map(|turn| turn.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            text.push('\n');
            text.push_str(query);
            text
        } else {
            query.to_string()
        };

        let raw = match self.chat.extract_names(&source_text).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Name extraction failed: {}", e);
                return None;
            }
        };

        let name = split_names(&raw).pop()?;
        debug!(follow_up, "Extracted movie name {:?}", name);

        match self.catalog.lookup_by_name(&name).await {
            Ok(Some(movie)) if movie.has_plot() => Some(movie),
            Ok(Some(movie)) => {
                debug!("{} has no plot, treating as unresolved", movie.name);
                None
            }
            Ok(None) => {
                debug!("No catalog entry for {:?}", name);
                None
            }
            Err(e) => {
                warn!("Catalog lookup for {:?} failed: {}", name, e);
                None
            }
        }
    }

    /// Does `query` continue the subject of `history`?
    ///
    /// Errors count as "no".
    pub async fn continues_conversation(&self, query: &str, history: &[Turn]) -> bool {
        let prompt = prompts::continuation_prompt(query, &render_turns(history));
        match self
            .chat
            .classify_boolean(prompts::CONTINUATION_SYSTEM, &prompt)
            .await
        {
            Ok(related) => related,
            Err(e) => {
                warn!("Continuation check failed, treating query as new: {}", e);
                false
            }
        }
    }
}
