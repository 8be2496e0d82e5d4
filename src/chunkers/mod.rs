//! Sentence-packing strategies.

mod base;
mod hybrid_chunker;
mod paragraph_chunker;
mod sliding_window_chunker;

pub use base::{
    count_whitespace_tokens, count_word_tokens, counter_for, fallback_chunks, Chunker,
    TokenCounter, WhitespaceCounter, WordBoundaryCounter,
};
pub use hybrid_chunker::HybridChunker;
pub use paragraph_chunker::ParagraphChunker;
pub use sliding_window_chunker::SlidingWindowChunker;

use std::sync::Arc;

use tracing::Dispatch;

use crate::types::error::Result;
use crate::types::{ChunkMode, ChunkerConfig};

/// Build the chunker matching `config.mode`.
pub fn build_chunker(config: ChunkerConfig, log_sink: Option<Dispatch>) -> Result<Arc<dyn Chunker>> {
    let chunker: Arc<dyn Chunker> = match (config.mode, log_sink) {
        (ChunkMode::SlidingWindow, None) => Arc::new(SlidingWindowChunker::new(config)?),
        (ChunkMode::SlidingWindow, Some(sink)) => {
            Arc::new(SlidingWindowChunker::new(config)?.with_log_sink(sink))
        }
        (ChunkMode::Paragraph, None) => Arc::new(ParagraphChunker::new(config)?),
        (ChunkMode::Paragraph, Some(sink)) => {
            Arc::new(ParagraphChunker::new(config)?.with_log_sink(sink))
        }
        (ChunkMode::HybridTokenBudget, None) => Arc::new(HybridChunker::new(config)?),
        (ChunkMode::HybridTokenBudget, Some(sink)) => {
            Arc::new(HybridChunker::new(config)?.with_log_sink(sink))
        }
    };
    Ok(chunker)
}
