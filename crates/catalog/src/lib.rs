//! # Catalog Crate
//!
//! Read-only movie reference data for the Q&A pipeline.
//!
//! ## Main Components
//!
//! - **types**: `MovieRecord` and the local `CatalogIndex`
//! - **parser**: Parse `id::title::plot` catalog files
//! - **index**: Title and token indices, name lookup, similarity search
//! - **source**: The `MovieCatalog` trait the pipeline consumes
//! - **http**: `HttpMovieCatalog`, a remote catalog reached with reqwest
//! - **error**: Error types for loading and querying
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{CatalogIndex, MovieCatalog};
//! use std::path::Path;
//!
//! let index = CatalogIndex::load_from_file(Path::new("data/movies.dat"))?;
//! let movie = index.lookup_by_name("Inception");
//! let similar = index.search_similar("dreams inside dreams", 3);
//!
//! // Through the trait, as the pipeline sees it
//! let catalog: &dyn MovieCatalog = &index;
//! let movie = catalog.lookup_by_name("Inception").await?;
//! ```

pub mod error;
pub mod http;
pub mod index;
pub mod parser;
pub mod source;
pub mod types;

pub use error::{CatalogError, Result};
pub use http::HttpMovieCatalog;
pub use source::{LOCAL_SEARCH_LIMIT, MovieCatalog};
pub use types::{CatalogIndex, MovieId, MovieRecord};
