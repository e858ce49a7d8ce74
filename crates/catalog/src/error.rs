//! Error types for the catalog crate.
//!
//! Every variant that a caller can observe at query time collapses into the
//! same policy upstream: a catalog failure means "no movie found", and the
//! context pipeline moves on to its next strategy.

use thiserror::Error;

/// Errors that can occur while loading or querying a movie catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The remote catalog could not be reached or answered with a failure status
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// The remote catalog answered, but the body could not be decoded
    #[error("Invalid response from catalog: {0}")]
    InvalidResponse(String),

    /// I/O error occurred while reading a catalog file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in a catalog file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::InvalidResponse(err.to_string())
        } else {
            CatalogError::Unavailable(err.to_string())
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;
