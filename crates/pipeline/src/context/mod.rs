//! Context strategies.
//!
//! A query's context comes from exactly one source:
//! - a single resolved movie
//! - a handful of movies from a similarity search
//! - the conversation itself
//!
//! `ContextSelector` decides which source applies; `ContextBuilder` renders it
//! with an exhaustive match on `ContextSource`.

pub mod builder;
pub mod selector;

pub use builder::{ContextBuilder, ContextText};
pub use selector::ContextSelector;

use catalog::MovieRecord;
use history::Turn;
use std::fmt;

/// Data a context is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSource {
    SingleMovie(MovieRecord),
    /// Similarity hits, closest first
    SimilarMovies(Vec<MovieRecord>),
    Conversation(Vec<Turn>),
}

impl ContextSource {
    pub fn kind(&self) -> ContextKind {
        match self {
            ContextSource::SingleMovie(_) => ContextKind::SingleMovie,
            ContextSource::SimilarMovies(_) => ContextKind::SimilarMovies,
            ContextSource::Conversation(_) => ContextKind::Conversation,
        }
    }
}

/// Which strategy produced a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    SingleMovie,
    SimilarMovies,
    Conversation,
    /// No context was built (e.g. off-topic query)
    None,
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextKind::SingleMovie => "single-movie",
            ContextKind::SimilarMovies => "similar-movies",
            ContextKind::Conversation => "conversation",
            ContextKind::None => "none",
        };
        f.write_str(name)
    }
}

/// Assembled grounding text handed to answer generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextDocument {
    pub kind: ContextKind,
    pub text: String,
}

impl ContextDocument {
    pub fn new(kind: ContextKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(ContextKind::None, String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }
}
