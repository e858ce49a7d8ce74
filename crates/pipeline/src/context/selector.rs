//! Strategy selection.
//!
//! Strict order, first source with data wins:
//! 1. Single movie: the resolver found one movie with a plot
//! 2. Similar movies: the catalog's similarity search returned anything
//!    (top `similar_limit` kept, catalog ranking preserved)
//! 3. Conversation: the stored turns themselves

use super::{ContextBuilder, ContextDocument, ContextSource};
use crate::config::ContextConfig;
use crate::relevance::RelevanceFilter;
use crate::resolver::MovieResolver;
use crate::summarize::TwoTierSummarizer;
use catalog::MovieCatalog;
use history::Turn;
use llm_client::{ChatCompletion, TextSummarization};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

pub struct ContextSelector {
    resolver: MovieResolver,
    catalog: Arc<dyn MovieCatalog>,
    builder: ContextBuilder,
    similar_limit: usize,
}

impl ContextSelector {
    pub fn new(
        chat: Arc<dyn ChatCompletion>,
        catalog: Arc<dyn MovieCatalog>,
        summarizer: Arc<dyn TextSummarization>,
        config: &ContextConfig,
    ) -> Self {
        let relevance = RelevanceFilter::new(chat.clone())
            .with_chunking(config.chunk)
            .with_concurrency(config.relevance_concurrency);
        let summarizer = TwoTierSummarizer::new(summarizer, config.summary_sentence_cap);

        Self {
            resolver: MovieResolver::new(chat, catalog.clone()),
            catalog,
            builder: ContextBuilder::new(relevance, summarizer),
            similar_limit: config.similar_limit.max(1),
        }
    }

    /// Pick the context source for this turn
    pub async fn select(&self, query: &str, history: &[Turn]) -> ContextSource {
        if let Some(movie) = self.resolver.resolve(query, history).await {
            debug!("Resolved single movie {}", movie.name);
            return ContextSource::SingleMovie(movie);
        }

        match self.catalog.search_similar(query).await {
            Ok(mut movies) if !movies.is_empty() => {
                movies.truncate(self.similar_limit);
                debug!("Using {} similar movies", movies.len());
                return ContextSource::SimilarMovies(movies);
            }
            Ok(_) => debug!("Similarity search found nothing"),
            Err(e) => warn!("Similarity search failed: {}", e),
        }

        ContextSource::Conversation(history.to_vec())
    }

    /// Select a source and render it
    #[instrument(skip(self, history), fields(history_len = history.len()))]
    pub async fn build_context(&self, query: &str, history: &[Turn]) -> ContextDocument {
        let start = Instant::now();
        let source = self.select(query, history).await;
        let document = self.builder.render(source, query).await;

        info!(
            "Built {} context ({} chars) in {:.2}ms",
            document.kind,
            document.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        document
    }
}
