//! Rendering a `ContextSource` into text.

use super::{ContextDocument, ContextSource};
use crate::relevance::RelevanceFilter;
use crate::summarize::TwoTierSummarizer;
use catalog::MovieRecord;
use futures::future::join_all;
use history::{Turn, render_turns};
use tracing::debug;

/// Line-oriented text builder for movie contexts.
///
/// ```ignore
/// let text = ContextText::new()
///     .title("Heat")
///     .line("Heat movie plot: ...")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ContextText {
    lines: Vec<String>,
}

impl ContextText {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Movie Information:` header followed by `Title: {name}`
    pub fn title(mut self, name: &str) -> Self {
        self.lines.push("Movie Information:".to_string());
        self.lines.push(format!("Title: {}", name));
        self
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

/// Renders context sources, calling out to relevance filtering and
/// summarization where the strategy needs them.
pub struct ContextBuilder {
    relevance: RelevanceFilter,
    summarizer: TwoTierSummarizer,
}

impl ContextBuilder {
    pub fn new(relevance: RelevanceFilter, summarizer: TwoTierSummarizer) -> Self {
        Self {
            relevance,
            summarizer,
        }
    }

    pub async fn render(&self, source: ContextSource, query: &str) -> ContextDocument {
        let kind = source.kind();
        let text = match source {
            ContextSource::SingleMovie(movie) => self.single_movie(&movie, query).await,
            ContextSource::SimilarMovies(movies) => self.similar_movies(&movies, query).await,
            ContextSource::Conversation(turns) => conversation(&turns),
        };
        debug!(%kind, len = text.len(), "Context rendered");
        ContextDocument::new(kind, text)
    }

    async fn single_movie(&self, movie: &MovieRecord, query: &str) -> String {
        ContextText::new()
            .title(&movie.name)
            .line(self.relevance.plot_context(movie, query).await)
            .build()
    }

    /// Closest match in full (relevant sections), the rest as one-line summaries
    async fn similar_movies(&self, movies: &[MovieRecord], query: &str) -> String {
        let Some((closest, others)) = movies.split_first() else {
            return String::new();
        };

        let mut text = ContextText::new()
            .title(&closest.name)
            .line(self.relevance.plot_context(closest, query).await);

        if !others.is_empty() {
            // join_all keeps input order
            let summaries = join_all(others.iter().map(|movie| self.summary_line(movie))).await;
            text = text.line("\nOther similar movies:");
            for line in summaries {
                text = text.line(line);
            }
        }
        text.build()
    }

    async fn summary_line(&self, movie: &MovieRecord) -> String {
        if !movie.has_plot() {
            return format!("- {}", movie.name);
        }
        format!("- {}: {}", movie.name, self.summarizer.summarize(&movie.plot).await)
    }
}

/// `Previous conversation:` followed by `role: content` lines; empty without turns
fn conversation(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return String::new();
    }
    format!("Previous conversation:\n{}", render_turns(turns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextKind;
    use history::Role;
    use llm_client::fakes::{FakeSummarizer, ScriptedChat};
    use std::sync::Arc;

    fn builder(chat: ScriptedChat) -> ContextBuilder {
        ContextBuilder::new(
            RelevanceFilter::new(Arc::new(chat)),
            TwoTierSummarizer::new(Arc::new(FakeSummarizer::working()), 15),
        )
    }

    #[test]
    fn test_context_text() {
        let text = ContextText::new().title("Heat").line("Heat movie plot: A heist.").build();
        assert_eq!(text, "Movie Information:\nTitle: Heat\nHeat movie plot: A heist.");
    }

    #[tokio::test]
    async fn test_single_movie() {
        let movie = MovieRecord::new("1", "Heat", "A heist goes wrong.");
        let doc = builder(ScriptedChat::new())
            .render(ContextSource::SingleMovie(movie), "who dies?")
            .await;

        assert_eq!(doc.kind, ContextKind::SingleMovie);
        assert_eq!(
            doc.text,
            "Movie Information:\nTitle: Heat\nHeat movie plot: A heist goes wrong."
        );
    }

    #[tokio::test]
    async fn test_similar_movies() {
        let movies = vec![
            MovieRecord::new("1", "Alien", "A crew meets a creature. Ripley survives."),
            MovieRecord::new("2", "Aliens", "Marines fight aliens. Ripley returns."),
            MovieRecord::new("3", "Prometheus", ""),
        ];
        let doc = builder(ScriptedChat::new().relevant_when("Ripley"))
            .render(ContextSource::SimilarMovies(movies), "space horror")
            .await;

        assert_eq!(doc.kind, ContextKind::SimilarMovies);
        assert_eq!(
            doc.text,
            "Movie Information:\n\
             Title: Alien\n\
             Alien movie plot sections:\n\
             A crew meets a creature. Ripley survives.\n\
             \n\
             Other similar movies:\n\
             - Aliens: abstract: Marines fight aliens.\n\
             - Prometheus"
        );
    }

    #[tokio::test]
    async fn test_conversation() {
        let turns = vec![
            Turn::new("u", Role::User, "hi"),
            Turn::new("u", Role::Assistant, "hello"),
        ];
        let doc = builder(ScriptedChat::new())
            .render(ContextSource::Conversation(turns), "and?")
            .await;
        assert_eq!(doc.text, "Previous conversation:\nuser: hi\nassistant: hello");

        let empty = builder(ScriptedChat::new())
            .render(ContextSource::Conversation(Vec::new()), "and?")
            .await;
        assert!(empty.is_empty());
        assert_eq!(empty.kind, ContextKind::Conversation);
    }
}
