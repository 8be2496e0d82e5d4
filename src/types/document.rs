//! Input documents and per-document results.

use serde::{Deserialize, Serialize};

use super::{Chunk, ChunkMode};

/// A document whose text has already been extracted.
///
/// This is the input unit received from the extraction step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Name used to prefix chunk ids (usually the source file stem)
    pub name: String,

    /// The extracted text to chunk
    pub text: String,

    /// Packing mode override; the router's default mode is used when absent
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mode: Option<ChunkMode>,
}

impl Document {
    /// Create a document using the router's default mode.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            mode: None,
        }
    }

    /// Force a packing mode for this document.
    pub fn with_mode(mut self, mode: ChunkMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Get text length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether there is nothing but whitespace to chunk.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Chunks produced for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Name of the source document
    pub name: String,

    /// Mode the document was chunked with
    pub mode: ChunkMode,

    /// Chunks in emission order
    pub chunks: Vec<Chunk>,
}

impl DocumentResult {
    /// Number of primary (non-overlap) chunks.
    pub fn primary_count(&self) -> usize {
        self.chunks.iter().filter(|c| !c.is_overlap()).count()
    }
}
