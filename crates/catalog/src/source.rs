//! The `MovieCatalog` trait: the only way the pipeline reaches movie data.

use crate::error::Result;
use crate::types::{CatalogIndex, MovieRecord};
use async_trait::async_trait;
use std::sync::Arc;

/// Most results a local similarity search hands back
pub const LOCAL_SEARCH_LIMIT: usize = 20;

/// Lookup and similarity search over a movie catalog.
///
/// Implementations may be remote, so both calls are async and fallible.
/// "Not found" is `Ok(None)` / an empty list, never an error.
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Find the movie with the given name
    async fn lookup_by_name(&self, name: &str) -> Result<Option<MovieRecord>>;

    /// Movies related to a free-text query, best match first.
    ///
    /// No size guarantee: callers truncate.
    async fn search_similar(&self, query: &str) -> Result<Vec<MovieRecord>>;
}

#[async_trait]
impl MovieCatalog for CatalogIndex {
    async fn lookup_by_name(&self, name: &str) -> Result<Option<MovieRecord>> {
        Ok(CatalogIndex::lookup_by_name(self, name).cloned())
    }

    async fn search_similar(&self, query: &str) -> Result<Vec<MovieRecord>> {
        Ok(CatalogIndex::search_similar(self, query, LOCAL_SEARCH_LIMIT)
            .into_iter()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl<T: MovieCatalog + ?Sized> MovieCatalog for Arc<T> {
    async fn lookup_by_name(&self, name: &str) -> Result<Option<MovieRecord>> {
        (**self).lookup_by_name(name).await
    }

    async fn search_similar(&self, query: &str) -> Result<Vec<MovieRecord>> {
        (**self).search_similar(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_index_through_trait_object() {
        let index = CatalogIndex::from_movies(vec![
            MovieRecord::new("1", "Alien", "A crew meets a deadly creature in space."),
            MovieRecord::new("2", "Aliens", "Marines return to fight the creature."),
        ])
        .unwrap();
        let catalog: Arc<dyn MovieCatalog> = Arc::new(index);

        let found = catalog.lookup_by_name("alien").await.unwrap().unwrap();
        assert_eq!(found.id, "1");

        let similar = catalog.search_similar("creature").await.unwrap();
        assert_eq!(similar.len(), 2);
        assert_eq!(similar[0].name, "Alien");

        assert!(catalog.lookup_by_name("Heat").await.unwrap().is_none());
    }
}
