//! Token-window chunking.
//!
//! Tokens are whitespace-delimited words. The same tokenizer backs the
//! token counts reported by the text generation endpoint, so ingestion
//! chunk sizes and billed token counts agree.

use crate::error::{RagError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub index: usize,
    /// Token span `[start, end)` in the source token sequence.
    pub start: usize,
    pub end: usize,
    pub text: String,
}

pub fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split `tokens` into windows of exactly `chunk_size` items; the final
/// window holds the remainder (1..=chunk_size items). Empty input yields
/// no windows. `chunk_size` is signed so callers passing untrusted sizes
/// get an error instead of a wrap-around.
pub fn chunk<T>(tokens: &[T], chunk_size: i64) -> Result<Vec<&[T]>> {
    if chunk_size <= 0 {
        return Err(RagError::invalid(format!(
            "chunk size must be greater than 0, got {}",
            chunk_size
        )));
    }
    let size = usize::try_from(chunk_size)
        .map_err(|_| RagError::invalid(format!("chunk size {} does not fit in memory", chunk_size)))?;

    Ok(tokens.chunks(size).collect())
}

pub fn chunk_text(text: &str, chunk_size: i64) -> Result<Vec<TextChunk>> {
    let tokens = tokenize(text);
    let windows = chunk(&tokens, chunk_size)?;

    let mut start = 0;
    let chunks = windows
        .into_iter()
        .enumerate()
        .map(|(index, window)| {
            let end = start + window.len();
            let chunk = TextChunk {
                index,
                start,
                end,
                text: window.join(" "),
            };
            start = end;
            chunk
        })
        .collect();

    Ok(chunks)
}
