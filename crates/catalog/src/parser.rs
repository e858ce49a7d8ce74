//! Parser for local catalog files.
//!
//! Format: one movie per line, `id::title::plot`.
//! The plot is everything after the second separator, so it may itself
//! contain `::`. Blank lines and lines starting with `#` are skipped.

use crate::error::{CatalogError, Result};
use crate::types::MovieRecord;
use std::path::Path;

const SEPARATOR: &str = "::";

/// Parse a catalog file from disk
pub fn parse_movies(path: &Path) -> Result<Vec<MovieRecord>> {
    let content = std::fs::read_to_string(path)?;
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_movies_str(&content, &file)
}

/// Parse catalog content already held in memory.
///
/// `file` is only used to label parse errors.
pub fn parse_movies_str(content: &str, file: &str) -> Result<Vec<MovieRecord>> {
    let mut movies = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() || line_trimmed.starts_with('#') {
            continue;
        }

        let mut parts = line_trimmed.splitn(3, SEPARATOR);

        let id = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| parse_error(file, line_no, "Missing id"))?;

        let title = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| parse_error(file, line_no, "Missing title"))?;

        let plot = parts
            .next()
            .ok_or_else(|| parse_error(file, line_no, "Missing plot"))?;

        movies.push(MovieRecord::new(id, title, plot.trim()));
    }

    Ok(movies)
}

fn parse_error(file: &str, line: usize, reason: &str) -> CatalogError {
    CatalogError::ParseError {
        file: file.to_string(),
        line,
        reason: reason.to_string(),
    }
}
