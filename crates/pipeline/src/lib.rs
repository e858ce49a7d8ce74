//! Context resolution pipeline for movie questions.
//!
//! This crate provides:
//! - Plot chunking and per-chunk relevance filtering
//! - Intent classification (is this about movies?)
//! - Movie resolution from the query and the conversation
//! - Two-tier summarization for secondary movies
//! - Context strategy selection and rendering
//!
//! ## Architecture
//! For each query the pipeline decides what grounding text to hand to answer
//! generation:
//! 1. `MovieResolver` tries to pin the turn to one catalog movie
//! 2. `ContextSelector` falls back to a similarity search, then to the
//!    conversation itself
//! 3. `ContextBuilder` renders the chosen `ContextSource`, keeping only the
//!    plot chunks that can answer the question
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{ContextConfig, ContextSelector};
//!
//! let selector = ContextSelector::new(chat, catalog, summarizer, &ContextConfig::default());
//! let context = selector.build_context("what happens at the end?", &history).await;
//! ```

pub mod chunker;
pub mod config;
pub mod context;
pub mod error;
pub mod intent;
pub mod relevance;
pub mod resolver;
pub mod summarize;

// Re-export main types
pub use chunker::{PlotChunk, chunk_plot, expected_chunk_count};
pub use config::{ChunkConfig, ContextConfig};
pub use context::{
    ContextBuilder, ContextDocument, ContextKind, ContextSelector, ContextSource, ContextText,
};
pub use error::{PipelineError, Result};
pub use intent::IntentClassifier;
pub use relevance::RelevanceFilter;
pub use resolver::MovieResolver;
pub use summarize::TwoTierSummarizer;
