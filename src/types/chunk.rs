//! Chunk type definitions.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Number of leading words used to build a chunk identifier.
const ID_PREFIX_WORDS: usize = 5;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"\W+").unwrap();
}

/// A chunk of a document.
///
/// Chunks are the unit handed to the persistence layer. A chunk sequence is
/// rebuilt from scratch on every call, so `index` and `chunk_id` only mean
/// something within one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Sentences joined by the mode's separator
    pub text: String,

    /// Word count; the counting policy depends on the chunker that produced it
    pub token_count: usize,

    /// Length of `text` in Unicode scalar values
    pub char_count: usize,

    /// Position in the chunk sequence (0-indexed)
    pub index: usize,

    /// Index plus a sanitized prefix of the first words
    pub chunk_id: String,

    /// Set only by the token-budget chunker: `true` for synthetic overlap chunks
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is_overlapping: Option<bool>,

    /// Provenance of this chunk
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk, deriving `char_count` and `chunk_id` from the text.
    pub fn new(text: String, token_count: usize, index: usize) -> Self {
        let char_count = text.chars().count();
        let chunk_id = chunk_id(index, &text);
        Self {
            text,
            token_count,
            char_count,
            index,
            chunk_id,
            is_overlapping: None,
            metadata: ChunkMetadata::default(),
        }
    }

    /// Create a chunk with metadata.
    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Mark the chunk as a primary (`false`) or overlap (`true`) chunk.
    pub fn with_overlap_flag(mut self, is_overlapping: bool) -> Self {
        self.is_overlapping = Some(is_overlapping);
        self
    }

    /// Identifier prefixed with a document name, for use across documents.
    pub fn qualified_id(&self, document: &str) -> String {
        format!("{}_{}", document, self.chunk_id)
    }

    /// Whether this is a synthetic overlap chunk.
    pub fn is_overlap(&self) -> bool {
        self.is_overlapping.unwrap_or(false)
    }

    /// Get the length of the chunk text in characters.
    pub fn len(&self) -> usize {
        self.char_count
    }

    /// Check if the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Metadata associated with a chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Name of the strategy that produced the chunk ("paragraph", "block_fallback", ...)
    pub strategy: String,

    /// Half-open range of segmenter sentences covered by the chunk
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sentence_span: Option<(usize, usize)>,

    /// Document name, filled in by the batch processor
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub document: Option<String>,
}

impl ChunkMetadata {
    /// Metadata for a chunk built from whole sentences.
    pub fn for_sentences(strategy: &str, start: usize, end: usize) -> Self {
        Self {
            strategy: strategy.to_string(),
            sentence_span: Some((start, end)),
            document: None,
        }
    }

    /// Metadata for a chunk produced by a fallback that ignores sentences.
    pub fn for_fallback(strategy: &str) -> Self {
        Self {
            strategy: strategy.to_string(),
            ..Default::default()
        }
    }

    /// Set the document name.
    pub fn with_document(mut self, document: &str) -> Self {
        self.document = Some(document.to_string());
        self
    }
}

/// Build a chunk identifier from its index and the first words of its text.
///
/// Non-word characters are stripped from each word, so `"art. 1414 c.c."`
/// contributes `art_1414_cc`.
pub fn chunk_id(index: usize, text: &str) -> String {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| NON_WORD.replace_all(w, "").into_owned())
        .filter(|w| !w.is_empty())
        .take(ID_PREFIX_WORDS)
        .collect();

    if words.is_empty() {
        format!("{:04}", index)
    } else {
        format!("{:04}_{}", index, words.join("_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_chunk_id_strips_punctuation() {
        assert_eq!(
            chunk_id(3, "Vedi art. 1414 c.c. Il contratto è valido."),
            "0003_Vedi_art_1414_cc_Il"
        );
    }

    #[test]
    fn test_chunk_id_without_words() {
        assert_eq!(chunk_id(12, "... --- !!!"), "0012");
    }

    #[test]
    fn test_char_count_is_unicode_aware() {
        let chunk = Chunk::new("è già".to_string(), 2, 0);
        assert_eq!(chunk.char_count, 5);
        assert_eq!(chunk.len(), 5);
        assert!(!chunk.is_overlap());
    }

    #[test]
    fn test_qualified_id() {
        let chunk = Chunk::new("Il contratto".to_string(), 2, 1);
        assert_eq!(chunk.qualified_id("sentenza_42"), "sentenza_42_0001_Il_contratto");
    }

    #[test]
    fn test_overlap_flag_serialization() {
        let primary = Chunk::new("Testo".to_string(), 1, 0);
        let json = serde_json::to_value(&primary).unwrap();
        assert!(json.get("is_overlapping").is_none());

        let overlap = Chunk::new("Testo".to_string(), 1, 1).with_overlap_flag(true);
        let json = serde_json::to_value(&overlap).unwrap();
        assert_eq!(json["is_overlapping"], serde_json::json!(true));
    }
}
