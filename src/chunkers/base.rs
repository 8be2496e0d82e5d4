//! Base trait and shared helpers for all chunkers.

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn, Dispatch};

use crate::fallback::block_slices;
use crate::types::{Chunk, ChunkMetadata, ChunkMode, ChunkerConfig};
use crate::{APPROX_CHARS_PER_TOKEN, FALLBACK_STRATEGY};

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\b\w+\b").unwrap();
}

/// The core trait that all chunkers implement.
///
/// A chunker turns extracted text into an ordered list of bounded chunks.
/// Implementations provide [`Chunker::try_chunk`]; callers use
/// [`Chunker::chunk`], which never fails.
pub trait Chunker: Send + Sync {
    /// Get the name of this chunker.
    fn name(&self) -> &'static str;

    /// Get the description of this chunker.
    fn description(&self) -> &'static str {
        "A text chunker"
    }

    /// Configuration the chunker was built with.
    fn config(&self) -> &ChunkerConfig;

    /// Logging sink injected at construction, if any.
    fn log_sink(&self) -> Option<&Dispatch> {
        None
    }

    /// Chunk the given text, reporting internal failures.
    fn try_chunk(&self, text: &str) -> Result<Vec<Chunk>>;

    /// Chunk the given text.
    ///
    /// Blank text yields no chunks. Any other text yields at least one
    /// chunk: internal errors and empty results are logged and replaced by
    /// fixed-size block slicing.
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        match self.log_sink() {
            Some(dispatch) => {
                tracing::dispatcher::with_default(dispatch, || guarded_chunk(self, text))
            }
            None => guarded_chunk(self, text),
        }
    }
}

fn guarded_chunk<C: Chunker + ?Sized>(chunker: &C, text: &str) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return vec![];
    }

    match chunker.try_chunk(text) {
        Ok(chunks) if !chunks.is_empty() => {
            debug!(chunker = chunker.name(), chunks = chunks.len(), "Chunking complete");
            chunks
        }
        Ok(_) => {
            debug!(
                chunker = chunker.name(),
                "No usable sentences, falling back to block slicing"
            );
            fallback_chunks(text, chunker.config())
        }
        Err(e) => {
            warn!(
                chunker = chunker.name(),
                error = %e,
                "Chunking failed, falling back to block slicing"
            );
            fallback_chunks(text, chunker.config())
        }
    }
}

/// Token counter trait for counting tokens in text.
pub trait TokenCounter: Send + Sync {
    /// Short name of the counting policy.
    fn name(&self) -> &'static str;

    /// Count the number of tokens in the given text.
    fn count_tokens(&self, text: &str) -> usize;
}

/// Counts whitespace-delimited words. Used by the character-budget chunkers.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn name(&self) -> &'static str {
        "whitespace"
    }

    fn count_tokens(&self, text: &str) -> usize {
        count_whitespace_tokens(text)
    }
}

/// Counts `\b\w+\b` matches. Used by the token-budget chunker.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordBoundaryCounter;

impl TokenCounter for WordBoundaryCounter {
    fn name(&self) -> &'static str {
        "word_boundary"
    }

    fn count_tokens(&self, text: &str) -> usize {
        count_word_tokens(text)
    }
}

/// Number of whitespace-delimited words.
pub fn count_whitespace_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Number of regex word-boundary matches (`"c.c."` counts as two).
pub fn count_word_tokens(text: &str) -> usize {
    WORD.find_iter(text).count()
}

/// The counting policy a mode reports in `Chunk::token_count`.
pub fn counter_for(mode: ChunkMode) -> &'static dyn TokenCounter {
    match mode {
        ChunkMode::SlidingWindow | ChunkMode::Paragraph => &WhitespaceCounter,
        ChunkMode::HybridTokenBudget => &WordBoundaryCounter,
    }
}

/// Length of `sentences[start..end]` joined by a separator of `joiner_len` chars.
pub(crate) fn joined_len(lengths: &[usize], start: usize, end: usize, joiner_len: usize) -> usize {
    if end <= start {
        return 0;
    }
    lengths[start..end].iter().sum::<usize>() + joiner_len * (end - start - 1)
}

/// Build a chunk from a half-open range of sentences.
pub(crate) fn sentence_chunk(
    sentences: &[String],
    start: usize,
    end: usize,
    index: usize,
    mode: ChunkMode,
    strategy: &str,
) -> Chunk {
    let text = sentences[start..end].join(mode.joiner());
    let token_count = counter_for(mode).count_tokens(&text);
    Chunk::new(text, token_count, index)
        .with_metadata(ChunkMetadata::for_sentences(strategy, start, end))
}

/// Fixed-size block slicing used when sentence packing has nothing to offer.
///
/// Sizes are characters in character modes and approximated from tokens in
/// the token-budget mode. Token-budget fallback chunks keep even indices and
/// are flagged as primaries.
pub fn fallback_chunks(text: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let mode = config.mode;
    let (block_size, overlap) = if mode.is_token_budget() {
        (
            config.max_chunk_size * APPROX_CHARS_PER_TOKEN,
            config.overlap * APPROX_CHARS_PER_TOKEN,
        )
    } else {
        (config.max_chunk_size, config.overlap)
    };
    let counter = counter_for(mode);

    block_slices(text, block_size, overlap)
        .into_iter()
        .enumerate()
        .map(|(i, block)| {
            let token_count = counter.count_tokens(&block);
            let metadata = ChunkMetadata::for_fallback(FALLBACK_STRATEGY);
            if mode.is_token_budget() {
                Chunk::new(block, token_count, i * 2)
                    .with_metadata(metadata)
                    .with_overlap_flag(false)
            } else {
                Chunk::new(block, token_count, i).with_metadata(metadata)
            }
        })
        .collect()
}
