//! Relevance filtering of plot chunks.
//!
//! Every chunk is classified independently ("can this section alone answer
//! the question?"). Classifications run concurrently, but `buffered` yields
//! results in submission order, so the kept chunks always come back in plot
//! order no matter which call finishes first.

use crate::chunker::{PlotChunk, chunk_plot};
use crate::config::ChunkConfig;
use catalog::MovieRecord;
use futures::stream::{self, StreamExt};
use llm_client::{ChatCompletion, prompts};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

pub struct RelevanceFilter {
    chat: Arc<dyn ChatCompletion>,
    chunking: ChunkConfig,
    concurrency: usize,
}

impl RelevanceFilter {
    pub fn new(chat: Arc<dyn ChatCompletion>) -> Self {
        Self {
            chat,
            chunking: ChunkConfig::default(),
            concurrency: 4,
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Chunks of `plot` judged able to answer `query`, in plot order.
    ///
    /// A failed or garbled classification counts as "not relevant".
    #[instrument(skip(self, plot), fields(plot_len = plot.len()))]
    pub async fn relevant_chunks(&self, plot: &str, query: &str) -> Vec<String> {
        let start = Instant::now();
        let chunks = chunk_plot(plot, &self.chunking);
        if chunks.is_empty() {
            return Vec::new();
        }

        let verdicts: Vec<bool> = stream::iter(chunks.iter().map(|chunk| self.judge(query, chunk)))
            .buffered(self.concurrency)
            .collect()
            .await;

        let total = chunks.len();
        let kept: Vec<String> = chunks
            .into_iter()
            .zip(verdicts)
            .filter_map(|(chunk, keep)| keep.then_some(chunk.text))
            .collect();

        debug!(
            "Kept {}/{} chunks in {:.2}ms",
            kept.len(),
            total,
            start.elapsed().as_secs_f64() * 1000.0
        );
        kept
    }

    /// Plot text for `movie`: the relevant sections, or the whole plot when
    /// no section is relevant on its own.
    pub async fn plot_context(&self, movie: &MovieRecord, query: &str) -> String {
        let sections = self.relevant_chunks(&movie.plot, query).await;
        if sections.is_empty() {
            format!("{} movie plot: {}", movie.name, movie.plot)
        } else {
            format!("{} movie plot sections:\n{}", movie.name, sections.join("\n"))
        }
    }

    async fn judge(&self, query: &str, chunk: &PlotChunk) -> bool {
        let prompt = prompts::relevance_prompt(query, &chunk.text);
        match self
            .chat
            .classify_boolean(prompts::RELEVANCE_SYSTEM, &prompt)
            .await
        {
            Ok(relevant) => relevant,
            Err(e) => {
                warn!("Relevance check for chunk {} failed, skipping it: {}", chunk.index, e);
                false
            }
        }
    }
}
