//! Greedy character-budget chunker.

use anyhow::Result;
use tracing::{debug, Dispatch};

use super::base::{joined_len, sentence_chunk, Chunker};
use crate::segmenter::SentenceSegmenter;
use crate::types::error::Result as ConfigResult;
use crate::types::{Chunk, ChunkMode, ChunkerConfig};

/// Sentence-packing chunker with a character budget.
///
/// Sentences are accumulated until the next one would push the chunk past
/// `max_chunk_size`; the chunk is then closed at that sentence boundary.
/// A chunk is only closed early once it has reached `min_chunk_size`, so
/// undersized chunks only appear at the end of a document.
pub struct ParagraphChunker {
    config: ChunkerConfig,
    segmenter: SentenceSegmenter,
    log_sink: Option<Dispatch>,
}

impl ParagraphChunker {
    /// Create a new paragraph chunker.
    pub fn new(config: ChunkerConfig) -> ConfigResult<Self> {
        config.validate()?;
        let config = ChunkerConfig {
            mode: ChunkMode::Paragraph,
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

    /// Group sentence lengths into half-open chunk ranges.
    fn pack(&self, lengths: &[usize]) -> Vec<(usize, usize)> {
        let joiner = self.config.mode.joiner().len();
        let max = self.config.max_chunk_size;
        let min = self.config.min_chunk_size;

        let mut spans = Vec::new();
        let mut start = 0;

        for i in 0..lengths.len() {
            if i == start {
                continue;
            }
            let current = joined_len(lengths, start, i, joiner);
            let with_next = current + joiner + lengths[i];
            if with_next > max && current >= min {
                spans.push((start, i));
                start = i;
            } else if with_next > max {
                debug!(current, min, "Extending undersized chunk past the budget");
            }
        }

        if start < lengths.len() {
            spans.push((start, lengths.len()));
        }

        spans
    }
}

impl Chunker for ParagraphChunker {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn description(&self) -> &'static str {
        "Greedily packs whole sentences into chunks under a character budget"
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

        let lengths: Vec<usize> = sentences.iter().map(|s| s.chars().count()).collect();
        let chunks = self
            .pack(&lengths)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| {
                sentence_chunk(&sentences, start, end, index, self.config.mode, self.name())
            })
            .collect();

        Ok(chunks)
    }
}
