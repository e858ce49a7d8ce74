//! Fixed-window plot chunking.
//!
//! ## Algorithm
//! 1. Take `window` characters starting at `start`
//! 2. If that reaches the end of the plot, stop: the last chunk always ends
//!    exactly at the plot's length
//! 3. Otherwise the next chunk starts `overlap` characters before this one
//!    ended
//!
//! Offsets count characters, not bytes, so multi-byte text never splits
//! inside a code point.

use crate::config::ChunkConfig;

/// A contiguous window of a plot. `start..end` are character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotChunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl PlotChunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `plot` into overlapping windows. An empty plot yields no chunks.
pub fn chunk_plot(plot: &str, config: &ChunkConfig) -> Vec<PlotChunk> {
    // Byte offset of every character, plus the end of the string
    let mut offsets: Vec<usize> = plot.char_indices().map(|(i, _)| i).collect();
    let total = offsets.len();
    if total == 0 {
        return Vec::new();
    }
    offsets.push(plot.len());

    let window = config.window.max(1);
    let stride = config.stride();

    let mut chunks = Vec::with_capacity(expected_chunk_count(total, config));
    let mut start = 0;
    loop {
        let end = (start + window).min(total);
        chunks.push(PlotChunk {
            index: chunks.len(),
            start,
            end,
            text: plot[offsets[start]..offsets[end]].to_string(),
        });
        if end == total {
            break;
        }
        start += stride;
    }
    chunks
}

/// Number of chunks `chunk_plot` produces for a plot of `len` characters:
/// `1 + ceil((len - window) / (window - overlap))` once `len` exceeds the window.
pub fn expected_chunk_count(len: usize, config: &ChunkConfig) -> usize {
    let window = config.window.max(1);
    match len {
        0 => 0,
        n if n <= window => 1,
        n => 1 + (n - window).div_ceil(config.stride()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot_of(len: usize) -> String {
        (0..len)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect()
    }

    #[test]
    fn test_empty_plot_has_no_chunks() {
        assert!(chunk_plot("", &ChunkConfig::default()).is_empty());
    }

    #[test]
    fn test_short_plot_is_one_chunk() {
        let chunks = chunk_plot("A short plot.", &ChunkConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, 13);
        assert_eq!(chunks[0].text, "A short plot.");
    }

    #[test]
    fn test_ten_thousand_characters() {
        let plot = plot_of(10_000);
        let chunks = chunk_plot(&plot, &ChunkConfig::default());

        let bounds: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(bounds, vec![(0, 3600), (3460, 7060), (6920, 10_000)]);
        assert_eq!(chunks.len(), expected_chunk_count(10_000, &ChunkConfig::default()));

        let last = chunks.last().unwrap();
        assert!(last.start <= 9_999);
        assert_eq!(last.end, 10_000);
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let plot = plot_of(8_000);
        let chunks = chunk_plot(&plot, &ChunkConfig::default());
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end - pair[1].start, 140);
            // ASCII plot, so byte and character offsets agree
            let tail = &pair[0].text[pair[0].text.len() - 140..];
            assert!(pair[1].text.starts_with(tail));
        }
    }

    #[test]
    fn test_last_chunk_always_reaches_the_end() {
        let config = ChunkConfig::new(50, 7).unwrap();
        for len in 1..400 {
            let chunks = chunk_plot(&plot_of(len), &config);
            assert_eq!(chunks.len(), expected_chunk_count(len, &config), "len {}", len);
            assert_eq!(chunks.last().unwrap().end, len);
            assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= 50));
            assert_eq!(chunks.iter().filter(|c| c.end == len).count(), 1);
        }
    }

    #[test]
    fn test_offsets_are_characters() {
        let plot = "é".repeat(30);
        let chunks = chunk_plot(&plot, &ChunkConfig::new(10, 2).unwrap());
        assert_eq!(chunks[0].text.chars().count(), 10);
        assert_eq!(chunks.last().unwrap().end, 30);
    }
}
