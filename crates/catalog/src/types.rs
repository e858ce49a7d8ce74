//! Core catalog types.
//!
//! `MovieRecord` is read-only reference data: the pipeline reads the name and
//! plot, never mutates either, and never persists them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a movie in the catalog (IMDb number or local id)
pub type MovieId = String;

/// A single movie as returned by a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    #[serde(default, alias = "Id", alias = "imdbNumber", alias = "identifier")]
    pub id: MovieId,
    #[serde(alias = "Name", alias = "title", alias = "Title")]
    pub name: String,
    #[serde(default, alias = "Plot")]
    pub plot: String,
}

impl MovieRecord {
    pub fn new(id: impl Into<MovieId>, name: impl Into<String>, plot: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            plot: plot.into(),
        }
    }

    /// True when the record carries usable plot text.
    pub fn has_plot(&self) -> bool {
        !self.plot.trim().is_empty()
    }
}

// =============================================================================
// CatalogIndex - local, file-backed catalog
// =============================================================================

/// In-memory movie catalog with title and token indices.
///
/// Records are stored once in `movies`; every index refers to them by
/// position, so lookups hand out references and only clone on the way out
/// through the `MovieCatalog` trait.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    pub(crate) movies: Vec<MovieRecord>,
    /// Lowercased, trimmed title -> position in `movies`
    pub(crate) by_title: HashMap<String, usize>,
    /// Search token -> positions of movies whose title or plot contain it
    pub(crate) token_index: HashMap<String, Vec<usize>>,
}

impl CatalogIndex {
    /// Creates a new, empty CatalogIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a movie by its identifier
    pub fn get_movie(&self, id: &str) -> Option<&MovieRecord> {
        self.movies.iter().find(|m| m.id == id)
    }

    /// All movies, in load order
    pub fn movies(&self) -> &[MovieRecord] {
        &self.movies
    }

    /// Number of movies in the catalog
    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}
