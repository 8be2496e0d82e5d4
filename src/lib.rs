//! Lexchunk Library
//!
//! Sentence-aware chunking of Italian legal text for retrieval pipelines.
//! Text is split into sentences with legal abbreviations protected, then
//! packed into chunks by one of three strategies: overlapping sliding
//! windows, greedy paragraphs, or token-budget chunks with explicit
//! overlap chunks.

pub mod batch;
pub mod chunkers;
pub mod fallback;
pub mod router;
pub mod segmenter;
pub mod telemetry;
pub mod types;

pub use batch::{BatchConfig, BatchProcessor, BatchResult, CancellationFlag};
pub use chunkers::{
    build_chunker, Chunker, HybridChunker, ParagraphChunker, SlidingWindowChunker,
};
pub use router::ChunkingRouter;
pub use segmenter::SentenceSegmenter;
pub use types::{
    Chunk, ChunkMetadata, ChunkMode, ChunkerConfig, ChunkingProfile, ChunkingSettings,
    ConfigError, Document, DocumentResult,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batch::*;
    pub use crate::chunkers::{build_chunker, Chunker, TokenCounter};
    pub use crate::router::ChunkingRouter;
    pub use crate::segmenter::SentenceSegmenter;
    pub use crate::types::*;
}

/// Default maximum chunk size in characters
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;

/// Default minimum chunk size in characters
pub const DEFAULT_MIN_CHUNK_SIZE: usize = 200;

/// Default sliding-window overlap in characters
pub const DEFAULT_OVERLAP_SIZE: usize = 200;

/// Default maximum chunk size in tokens
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// Default minimum chunk size in tokens
pub const DEFAULT_MIN_TOKENS: usize = 50;

/// Default overlap in tokens
pub const DEFAULT_OVERLAP_TOKENS: usize = 50;

/// Assumed sentence length when a document gives nothing to average
pub const DEFAULT_AVG_SENTENCE_CHARS: usize = 100;

/// Token counterpart of [`DEFAULT_AVG_SENTENCE_CHARS`]
pub const DEFAULT_AVG_SENTENCE_TOKENS: usize = 20;

/// Characters per token when converting token budgets to block sizes
pub const APPROX_CHARS_PER_TOKEN: usize = 4;

/// Strategy name recorded on chunks produced by the block fallback
pub const FALLBACK_STRATEGY: &str = "block_fallback";
