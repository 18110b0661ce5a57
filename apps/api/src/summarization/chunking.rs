//! Overlapping fixed-size chunking, measured in chars.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ChunkingError {
    #[error("chunk_size ({size}) must be greater than chunk_overlap ({overlap})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

/// Splits `text` into chunks of `chunk_size` chars where each chunk after
/// the first starts with the last `chunk_overlap` chars of the previous one.
/// Only the final chunk may be shorter than `chunk_size`.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size <= chunk_overlap {
        return Err(ChunkingError::OverlapTooLarge {
            size: chunk_size,
            overlap: chunk_overlap,
        });
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

/// Keeps at most `max_chars` chars from the start of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
