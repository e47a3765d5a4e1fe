//! Sliding-window text chunker.
//!
//! Splits document content into [`TextChunk`]s of at most `chunk_size`
//! characters, with `overlap` characters shared between consecutive
//! windows so a phrase cut at one boundary still appears whole in the
//! neighbouring chunk.
//!
//! # Algorithm
//!
//! 1. Work in characters (not bytes) so multi-byte text never splits inside
//!    a code point.
//! 2. Take a window of `chunk_size` chars starting at `start`.
//! 3. If the window ends inside a word, pull its end back to the last
//!    whitespace in the back half of the window.
//! 4. Emit the trimmed window, then start the next one `overlap` chars
//!    before the previous end (always moving forward).
//! 5. Stop once a window reaches the end of the text.
//!
//! Empty or whitespace-only text yields no chunks.
//!
//! # Example
//!
//! ```rust
//! use recall_core::chunk::{chunk_text, ChunkParams};
//!
//! let chunks = chunk_text("Hello world. Second sentence.", &ChunkParams::default());
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].ordinal, 0);
//! ```

/// Default window length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between consecutive windows, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// One chunk of a document, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Position within the document, contiguous from 0.
    pub ordinal: usize,
    /// Char offset of the window start in the original text.
    pub start: usize,
    pub text: String,
}

/// Split `text` into ordered, overlapping chunks.
///
/// # Guarantees
///
/// - Ordinals are contiguous: `0, 1, 2, …, N-1`.
/// - Chunk start offsets strictly increase, so output order matches
///   document order.
/// - Every chunk is non-empty and at most `chunk_size` chars long.
pub fn chunk_text(text: &str, params: &ChunkParams) -> Vec<TextChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let size = params.chunk_size.max(1);
    let overlap = params.overlap.min(size - 1);

    let chars: Vec<char> = text.chars().collect();
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let n = chars.len();

    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let mut end = (start + size).min(n);

        if end < n && !chars[end].is_whitespace() {
            let floor = start + size / 2;
            if let Some(ws) = (floor..end).rev().find(|&k| chars[k].is_whitespace()) {
                end = ws + 1;
            }
        }

        let piece = text[offsets[start]..offsets[end]].trim();
        if !piece.is_empty() {
            chunks.push(TextChunk {
                ordinal: chunks.len(),
                start,
                text: piece.to_string(),
            });
        }

        if end >= n {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    chunks
}
