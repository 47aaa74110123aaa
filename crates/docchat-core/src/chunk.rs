//! Fixed-width text chunker.
//!
//! Splits document text into consecutive, non-overlapping slices of at most
//! `max_len` characters. Concatenating the slices in order reproduces the
//! input exactly; every slice but the last is exactly `max_len` long.
//!
//! Lengths count Unicode scalar values, not bytes, so a slice never ends
//! inside a multi-byte character.
//!
//! # Known limitation
//!
//! The chunker has no notion of sentences or paragraphs. A boundary may
//! fall mid-word, and the retriever sees two half-sentences as unrelated
//! chunks.
//!
//! # Example
//!
//! ```rust
//! use docchat_core::chunk::chunk_text;
//!
//! let chunks = chunk_text(&"A".repeat(600), 500).unwrap();
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[0].len(), 500);
//! assert_eq!(chunks[1].len(), 100);
//! ```

use crate::error::{Error, Result};
use crate::models::Chunk;

/// Default character budget per chunk.
pub const DEFAULT_MAX_CHARS: usize = 500;

/// Split `text` into slices of `max_len` characters, preserving order.
///
/// Empty text yields an empty vector. `max_len` must be at least 1.
pub fn chunk_text(text: &str, max_len: usize) -> Result<Vec<String>> {
    if max_len == 0 {
        return Err(Error::InvalidArgument(
            "chunk max_len must be >= 1".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_len {
            chunks.push(text[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }

    if start < text.len() {
        chunks.push(text[start..].to_string());
    }

    Ok(chunks)
}

/// Chunk `text` and bind each slice to `project` with its ordinal.
pub fn make_chunks(project: &str, text: &str, max_len: usize) -> Result<Vec<Chunk>> {
    Ok(chunk_text(text, max_len)?
        .into_iter()
        .enumerate()
        .map(|(ordinal, content)| Chunk {
            project: project.to_string(),
            ordinal,
            content,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 500).unwrap().is_empty());
        assert!(chunk_text("", 1).unwrap().is_empty());
    }

    #[test]
    fn test_zero_max_len_is_rejected() {
        let err = chunk_text("abc", 0).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_six_hundred_chars() {
        let chunks = chunk_text(&"A".repeat(600), 500).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 500);
        assert_eq!(chunks[1].chars().count(), 100);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_chunk() {
        let chunks = chunk_text(&"x".repeat(1000), 500).unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 500));
    }

    #[test]
    fn test_concatenation_reproduces_input() {
        let text = "The quick brown fox jumps over the lazy dog.\n\nSecond paragraph here.";
        for max_len in [1, 2, 3, 7, 16, 64, 1000] {
            let chunks = chunk_text(text, max_len).unwrap();
            assert_eq!(chunks.concat(), text, "max_len={}", max_len);
            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|c| c.chars().count() == max_len));
            assert!(last.chars().count() <= max_len);
        }
    }

    #[test]
    fn test_multibyte_characters_are_not_split() {
        let text = "héllo wörld ✓✓✓ 日本語テキスト";
        let chunks = chunk_text(text, 4).unwrap();
        assert_eq!(chunks.concat(), text);
        assert_eq!(chunks[0], "héll");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    #[test]
    fn test_no_boundary_awareness() {
        let chunks = chunk_text("Hello world", 5).unwrap();
        assert_eq!(chunks, vec!["Hello", " worl", "d"]);
    }

    #[test]
    fn test_make_chunks_assigns_project_and_ordinals() {
        let chunks = make_chunks("alpha", "abcdefg", 3).unwrap();
        assert_eq!(chunks.len(), 3);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.ordinal, i);
            assert_eq!(c.project, "alpha");
        }
        assert_eq!(chunks[2].content, "g");
    }
}
