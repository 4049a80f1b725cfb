//! Overlapping character-window chunking.
//!
//! Splits flattened page text into windows of at most `max_chars` chars,
//! with consecutive windows sharing `overlap` chars. Offsets are char
//! positions into the input, half-open `[start, end)`, and line up with the
//! fragment spans produced by extraction.

use crate::models::Chunk;

/// Splits text into overlapping char windows.
///
/// The window start advances by `max_chars - overlap` per step, so every
/// consecutive pair shares exactly `overlap` chars of text. The final window
/// may be shorter than `max_chars`. Empty input yields no chunks.
pub fn split_text(text: &str, max_chars: usize, overlap: usize) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len == 0 {
        return Vec::new();
    }

    let max_chars = max_chars.max(1);
    let step = max_chars.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + max_chars).min(len);
        chunks.push(Chunk {
            index: chunks.len(),
            text: chars[start..end].iter().collect(),
            start,
            end,
        });
        if end == len {
            break;
        }
        start += step;
    }

    chunks
}
