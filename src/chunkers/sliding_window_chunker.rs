//! Sliding-window character-budget chunker.

use anyhow::Result;
use tracing::{debug, Dispatch};

use super::base::{joined_len, sentence_chunk, Chunker};
use crate::segmenter::SentenceSegmenter;
use crate::types::error::Result as ConfigResult;
use crate::types::{Chunk, ChunkMode, ChunkerConfig};
use crate::DEFAULT_AVG_SENTENCE_CHARS;

/// Chunker emitting overlapping windows of whole sentences.
///
/// The window size and overlap are converted from characters to sentence
/// counts using the document's average sentence length:
///
/// - `target = max_chunk_size / avg`
/// - `overlap = overlap / avg`
///
/// Each window is then shrunk until it fits the character budget (keeping at
/// least one sentence) or grown until it reaches `min_chunk_size`, and the
/// next window starts `len - overlap` sentences later (at least one).
pub struct SlidingWindowChunker {
    config: ChunkerConfig,
    segmenter: SentenceSegmenter,
    log_sink: Option<Dispatch>,
}

/// Sentence counts derived from the average sentence length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowPlan {
    target: usize,
    overlap: usize,
}

impl SlidingWindowChunker {
    /// Create a new sliding-window chunker.
    pub fn new(config: ChunkerConfig) -> ConfigResult<Self> {
        config.validate()?;
        let config = ChunkerConfig {
            mode: ChunkMode::SlidingWindow,
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

    fn plan(&self, lengths: &[usize]) -> WindowPlan {
        let total: usize = lengths.iter().sum();
        let avg = if lengths.is_empty() || total == 0 {
            DEFAULT_AVG_SENTENCE_CHARS as f64
        } else {
            total as f64 / lengths.len() as f64
        };

        WindowPlan {
            target: ((self.config.max_chunk_size as f64 / avg).floor() as usize).max(1),
            overlap: (self.config.overlap as f64 / avg).floor() as usize,
        }
    }

    /// Compute half-open sentence windows.
    fn windows(&self, lengths: &[usize]) -> Vec<(usize, usize)> {
        let n = lengths.len();
        let joiner = self.config.mode.joiner().len();
        let max = self.config.max_chunk_size;
        let min = self.config.min_chunk_size;
        let plan = self.plan(lengths);
        debug!(target = plan.target, overlap = plan.overlap, sentences = n, "Window plan");

        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut start = 0;

        while start < n {
            let mut end = (start + plan.target).min(n);
            while end > start + 1 && joined_len(lengths, start, end, joiner) > max {
                end -= 1;
            }
            while end < n && joined_len(lengths, start, end, joiner) < min {
                end += 1;
            }

            // Skip windows that add nothing past the previous one
            if spans.last().map_or(false, |&(_, prev_end)| end <= prev_end) {
                start += 1;
                continue;
            }

            spans.push((start, end));
            if end >= n {
                break;
            }
            start += (end - start).saturating_sub(plan.overlap).max(1);
        }

        spans
    }
}

impl Chunker for SlidingWindowChunker {
    fn name(&self) -> &'static str {
        "sliding_window"
    }

    fn description(&self) -> &'static str {
        "Overlapping windows of whole sentences under a character budget"
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
            .windows(&lengths)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| {
                sentence_chunk(&sentences, start, end, index, self.config.mode, self.name())
            })
            .collect();

        Ok(chunks)
    }
}
