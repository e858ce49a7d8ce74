//! CatalogIndex building and lookup logic.
//!
//! - Title index: exact, case-insensitive title -> movie
//! - Token index: search token -> movies mentioning it in title or plot
//!
//! The token index is built with Rayon: tokenizing plots is the only
//! expensive part of loading, and each movie is independent.

use crate::error::{CatalogError, Result};
use crate::parser;
use crate::types::{CatalogIndex, MovieRecord};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// Tokens shorter than this never enter the index
const MIN_TOKEN_LEN: usize = 3;

/// Substring title matches need at least this many characters
const MIN_SUBSTRING_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "about", "what", "who",
    "are", "was", "were", "movie", "movies", "film", "films", "like", "some",
    "any", "into", "his", "her", "their", "they", "them", "its", "has", "have",
    "had", "but", "not", "you", "your", "can", "does", "did", "where", "when",
    "which", "how", "why", "tell", "show", "want", "find",
];

impl CatalogIndex {
    /// Load a catalog from an `id::title::plot` file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading movie catalog from {:?}", path);
        let movies = parser::parse_movies(path)?;
        let index = Self::from_movies(movies)?;
        info!("Catalog loaded with {} movies", index.len());
        Ok(index)
    }

    /// Build a fully indexed catalog from records
    pub fn from_movies(movies: Vec<MovieRecord>) -> Result<Self> {
        let mut index = CatalogIndex::new();
        for movie in movies {
            index.insert_movie(movie);
        }
        index.validate()?;
        index.build_token_index();
        Ok(index)
    }

    /// Insert a movie and register its title.
    ///
    /// The token index is not updated; call `build_token_index` once all
    /// movies are in.
    pub fn insert_movie(&mut self, movie: MovieRecord) {
        let pos = self.movies.len();
        self.by_title.insert(normalize_title(&movie.name), pos);
        self.movies.push(movie);
    }

    /// Rebuild the token index from scratch
    pub fn build_token_index(&mut self) {
        let per_movie: Vec<(usize, HashSet<String>)> = self
            .movies
            .par_iter()
            .enumerate()
            .map(|(pos, movie)| {
                let tokens = tokenize(&movie.name).chain(tokenize(&movie.plot)).collect();
                (pos, tokens)
            })
            .collect();

        let mut token_index: HashMap<String, Vec<usize>> = HashMap::new();
        // per_movie is in position order, so every posting list stays sorted
        for (pos, tokens) in per_movie {
            for token in tokens {
                token_index.entry(token).or_default().push(pos);
            }
        }
        self.token_index = token_index;
    }

    /// Check that ids are unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for movie in &self.movies {
            if !seen.insert(movie.id.as_str()) {
                return Err(CatalogError::InvalidValue {
                    field: "id".to_string(),
                    value: movie.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Find a movie by name.
    ///
    /// Exact (case-insensitive) title match wins; otherwise the shortest
    /// title containing the name is returned.
    pub fn lookup_by_name(&self, name: &str) -> Option<&MovieRecord> {
        let needle = normalize_title(name);
        if needle.is_empty() {
            return None;
        }
        if let Some(&pos) = self.by_title.get(&needle) {
            return Some(&self.movies[pos]);
        }
        if needle.chars().count() < MIN_SUBSTRING_LEN {
            return None;
        }

        self.by_title
            .iter()
            .filter(|(title, _)| title.contains(&needle))
            .min_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(b.0)))
            .map(|(_, &pos)| &self.movies[pos])
    }

    /// Rank movies by how many query tokens they share.
    ///
    /// A token found in the title counts twice. Ties are broken by title so
    /// results are deterministic.
    pub fn search_similar(&self, query: &str, limit: usize) -> Vec<&MovieRecord> {
        let query_tokens: HashSet<String> = tokenize(query).collect();
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scores: HashMap<usize, u32> = HashMap::new();
        for token in &query_tokens {
            if let Some(postings) = self.token_index.get(token) {
                for &pos in postings {
                    *scores.entry(pos).or_insert(0) += 1;
                }
            }
        }

        let mut ranked: Vec<(usize, u32)> = scores
            .into_iter()
            .map(|(pos, score)| {
                let title_hits = tokenize(&self.movies[pos].name)
                    .collect::<HashSet<_>>()
                    .intersection(&query_tokens)
                    .count() as u32;
                (pos, score + title_hits)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| self.movies[a.0].name.cmp(&self.movies[b.0].name))
        });
        ranked.truncate(limit);

        ranked.into_iter().map(|(pos, _)| &self.movies[pos]).collect()
    }
}

fn normalize_title(title: &str) -> String {
    title
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}

/// Split text into lowercase search tokens, dropping short words and stopwords
pub(crate) fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_index() -> CatalogIndex {
        CatalogIndex::from_movies(vec![
            MovieRecord::new(
                "tt1375666",
                "Inception",
                "A thief steals corporate secrets through dream-sharing technology.",
            ),
            MovieRecord::new(
                "tt0133093",
                "The Matrix",
                "A hacker learns reality is a simulation run by machines.",
            ),
            MovieRecord::new(
                "tt0234215",
                "The Matrix Reloaded",
                "Neo and the rebels fight the machines inside the simulation.",
            ),
            MovieRecord::new("tt0816692", "Interstellar", "Explorers travel through a wormhole."),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_exact_is_case_insensitive() {
        let index = create_test_index();
        let movie = index.lookup_by_name("  the MATRIX ").unwrap();
        assert_eq!(movie.id, "tt0133093");
    }

    #[test]
    fn test_lookup_strips_quotes() {
        let index = create_test_index();
        assert_eq!(index.lookup_by_name("\"Inception\"").unwrap().id, "tt1375666");
    }

    #[test]
    fn test_lookup_substring_prefers_shortest_title() {
        let index = create_test_index();
        let movie = index.lookup_by_name("matrix").unwrap();
        assert_eq!(movie.name, "The Matrix");
    }

    #[test]
    fn test_lookup_missing_or_empty() {
        let index = create_test_index();
        assert!(index.lookup_by_name("Casablanca").is_none());
        assert!(index.lookup_by_name("   ").is_none());
        assert!(index.lookup_by_name("in").is_none());
    }

    #[test]
    fn test_search_similar_ranks_by_overlap() {
        let index = create_test_index();
        let results = index.search_similar("machines and simulation", 10);

        assert_eq!(results.len(), 2);
        // Both mention machines + simulation; tie broken by title
        assert_eq!(results[0].name, "The Matrix");
        assert_eq!(results[1].name, "The Matrix Reloaded");
    }

    #[test]
    fn test_search_similar_title_hits_weigh_more() {
        let index = create_test_index();
        let results = index.search_similar("interstellar travel", 10);
        assert_eq!(results[0].name, "Interstellar");
    }

    #[test]
    fn test_search_similar_respects_limit_and_stopwords() {
        let index = create_test_index();
        assert_eq!(index.search_similar("the simulation", 1).len(), 1);
        assert!(index.search_similar("the movie about", 10).is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = CatalogIndex::from_movies(vec![
            MovieRecord::new("1", "A", "plot"),
            MovieRecord::new("1", "B", "plot"),
        ]);
        assert!(matches!(result, Err(CatalogError::InvalidValue { .. })));
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tt0110912::Pulp Fiction::Two hitmen talk about burgers.").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "tt0114369::Se7en::Two detectives hunt a killer.").unwrap();

        let index = CatalogIndex::load_from_file(file.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup_by_name("se7en").unwrap().id, "tt0114369");
        assert_eq!(index.search_similar("detectives", 5)[0].name, "Se7en");
    }
}
