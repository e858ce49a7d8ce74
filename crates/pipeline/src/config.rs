//! Tunables for context building.

use crate::error::{PipelineError, Result};

/// Fixed-window plot chunking: `window` characters per chunk, consecutive
/// chunks sharing `overlap` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub window: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            window: 3600,
            overlap: 140,
        }
    }
}

impl ChunkConfig {
    /// Requires `0 <= overlap < window`
    pub fn new(window: usize, overlap: usize) -> Result<Self> {
        if window == 0 {
            return Err(PipelineError::InvalidConfig {
                field: "window",
                reason: "must be greater than zero".to_string(),
            });
        }
        if overlap >= window {
            return Err(PipelineError::InvalidConfig {
                field: "overlap",
                reason: format!("{} must be smaller than the window ({})", overlap, window),
            });
        }
        Ok(Self { window, overlap })
    }

    /// Distance between the starts of consecutive chunks
    pub fn stride(&self) -> usize {
        self.window.saturating_sub(self.overlap).max(1)
    }
}

/// Context building settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextConfig {
    /// How many similarity-search hits make it into the context
    pub similar_limit: usize,
    /// Sentence cap for summaries of the non-closest similar movies
    pub summary_sentence_cap: usize,
    /// Relevance checks in flight at once for one plot
    pub relevance_concurrency: usize,
    pub chunk: ChunkConfig,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            similar_limit: 3,
            summary_sentence_cap: 15,
            relevance_concurrency: 4,
            chunk: ChunkConfig::default(),
        }
    }
}

impl ContextConfig {
    pub fn with_similar_limit(mut self, limit: usize) -> Self {
        self.similar_limit = limit.max(1);
        self
    }

    pub fn with_summary_sentence_cap(mut self, cap: usize) -> Self {
        self.summary_sentence_cap = cap.max(1);
        self
    }

    pub fn with_relevance_concurrency(mut self, concurrency: usize) -> Self {
        self.relevance_concurrency = concurrency.max(1);
        self
    }

    pub fn with_chunk(mut self, chunk: ChunkConfig) -> Self {
        self.chunk = chunk;
        self
    }
}
