//! Token-budget chunker with synthetic overlap chunks.

use anyhow::{ensure, Result};
use tracing::{debug, Dispatch};

use super::base::{count_word_tokens, sentence_chunk, Chunker};
use crate::segmenter::SentenceSegmenter;
use crate::types::error::Result as ConfigResult;
use crate::types::{Chunk, ChunkMode, ChunkerConfig};
use crate::DEFAULT_AVG_SENTENCE_TOKENS;

/// Token-budget chunker.
///
/// Sentences are packed into primary chunks of at most `max_tokens` word
/// tokens; a boundary is only allowed once a chunk holds `min_tokens`. A
/// sentence longer than `max_tokens` becomes a chunk of its own.
///
/// Between two primaries an overlap chunk is built from the last sentences
/// of the first and the first sentences of the second, sized from
/// `overlap_tokens`. Overlap chunks below `min_tokens` are dropped.
///
/// Primaries take even indices, overlap chunks the odd index in between.
pub struct HybridChunker {
    config: ChunkerConfig,
    segmenter: SentenceSegmenter,
    log_sink: Option<Dispatch>,
}

impl HybridChunker {
    /// Create a new token-budget chunker.
    ///
    /// `min_chunk_size`, `max_chunk_size` and `overlap` are read as tokens.
    pub fn new(config: ChunkerConfig) -> ConfigResult<Self> {
        config.validate()?;
        let config = ChunkerConfig {
            mode: ChunkMode::HybridTokenBudget,
            ..config
        };
        let segmenter = SentenceSegmenter::from_config(&config);
        Ok(Self {
            config,
            segmenter,
            log_sink: None,
        })
    }

    /// Route this chunker's log events to `dispatch`.
    pub fn with_log_sink(mut self, dispatch: Dispatch) -> Self {
        self.log_sink = Some(dispatch);
        self
    }

    fn min_tokens(&self) -> usize {
        self.config.min_chunk_size
    }

    fn max_tokens(&self) -> usize {
        self.config.max_chunk_size
    }

    fn overlap_tokens(&self) -> usize {
        self.config.overlap
    }

    /// Group sentence token counts into primary chunk ranges.
    fn pack(&self, counts: &[usize]) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut start = 0;
        let mut current = 0;

        for (i, &tokens) in counts.iter().enumerate() {
            if tokens > self.max_tokens() {
                if i > start {
                    spans.push((start, i));
                }
                debug!(sentence = i, tokens, "Sentence exceeds token budget, isolating it");
                spans.push((i, i + 1));
                start = i + 1;
                current = 0;
                continue;
            }

            if i > start && current + tokens > self.max_tokens() && current >= self.min_tokens() {
                spans.push((start, i));
                start = i;
                current = tokens;
            } else {
                current += tokens;
            }
        }

        if start < counts.len() {
            spans.push((start, counts.len()));
        }

        spans
    }

    /// Sentence range of the overlap chunk between two adjacent primaries.
    ///
    /// Returns `None` when overlap is disabled.
    fn overlap_span(
        &self,
        counts: &[usize],
        before: (usize, usize),
        after: (usize, usize),
    ) -> Option<(usize, usize)> {
        if self.overlap_tokens() == 0 {
            return None;
        }
        let k = self.side_sentences(&counts[before.0..before.1]);
        let m = self.side_sentences(&counts[after.0..after.1]);
        if k == 0 || m == 0 {
            return None;
        }
        Some((before.1 - k, after.0 + m))
    }

    /// Sentences to take from one side: `overlap_tokens / avg`, at least one.
    fn side_sentences(&self, counts: &[usize]) -> usize {
        if counts.is_empty() {
            return 0;
        }
        let total: usize = counts.iter().sum();
        let avg = if total == 0 {
            DEFAULT_AVG_SENTENCE_TOKENS as f64
        } else {
            total as f64 / counts.len() as f64
        };
        ((self.overlap_tokens() as f64 / avg).floor() as usize).clamp(1, counts.len())
    }
}

impl Chunker for HybridChunker {
    fn name(&self) -> &'static str {
        "hybrid"
    }

    fn description(&self) -> &'static str {
        "Token-budget chunks with explicit overlap chunks between neighbours"
    }

    fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    fn log_sink(&self) -> Option<&Dispatch> {
        self.log_sink.as_ref()
    }

    fn try_chunk(&self, text: &str) -> Result<Vec<Chunk>> {
        let sentences = self.segmenter.segment(text);
        if sentences.is_empty() {
            return Ok(vec![]);
        }

        let counts: Vec<usize> = sentences.iter().map(|s| count_word_tokens(s)).collect();
        let primaries = self.pack(&counts);
        ensure!(
            primaries.first().map(|p| p.0) == Some(0)
                && primaries.last().map(|p| p.1) == Some(sentences.len()),
            "primary chunks do not cover the document"
        );

        let mode = self.config.mode;
        let mut chunks = Vec::with_capacity(primaries.len() * 2);

        for (i, &span) in primaries.iter().enumerate() {
            chunks.push(
                sentence_chunk(&sentences, span.0, span.1, i * 2, mode, self.name())
                    .with_overlap_flag(false),
            );

            let Some(&next) = primaries.get(i + 1) else {
                continue;
            };
            let Some((start, end)) = self.overlap_span(&counts, span, next) else {
                continue;
            };

            let overlap = sentence_chunk(&sentences, start, end, i * 2 + 1, mode, "hybrid_overlap")
                .with_overlap_flag(true);
            if overlap.token_count >= self.min_tokens() {
                chunks.push(overlap);
            } else {
                debug!(
                    index = i * 2 + 1,
                    tokens = overlap.token_count,
                    min_tokens = self.min_tokens(),
                    "Dropping undersized overlap chunk"
                );
            }
        }

        Ok(chunks)
    }
}
