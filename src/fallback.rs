//! Fallback cascade: increasingly crude splitting strategies.
//!
//! A [`Cascade`] is an ordered list of [`SplitStrategy`] values sharing one
//! signature. Strategies are tried in order until one yields a result the
//! cascade's acceptability predicate accepts. The last resort,
//! [`block_slices`], always terminates and always returns at least one block
//! for non-blank input.

use tracing::debug;

/// Parameters shared by every strategy in a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackParams {
    /// Block width in characters for fixed-size slicing
    pub block_size: usize,
    /// Characters repeated at the start of the next block
    pub overlap: usize,
}

impl FallbackParams {
    pub fn new(block_size: usize, overlap: usize) -> Self {
        Self {
            block_size: block_size.max(1),
            overlap,
        }
    }
}

/// Signature shared by all splitting strategies.
pub type SplitFn = fn(&str, &FallbackParams) -> Vec<String>;

/// A named splitting strategy.
#[derive(Clone, Copy)]
pub struct SplitStrategy {
    pub name: &'static str,
    pub split: SplitFn,
}

impl SplitStrategy {
    pub const fn new(name: &'static str, split: SplitFn) -> Self {
        Self { name, split }
    }
}

impl std::fmt::Debug for SplitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitStrategy").field("name", &self.name).finish()
    }
}

/// Paragraphs separated by a blank line.
pub const PARAGRAPHS: SplitStrategy = SplitStrategy::new("paragraphs", split_paragraphs);
/// Single lines.
pub const LINES: SplitStrategy = SplitStrategy::new("lines", split_lines);
/// Fixed-width blocks, no overlap.
pub const FIXED_BLOCKS: SplitStrategy = SplitStrategy::new("fixed_blocks", split_fixed_blocks);
/// The whole text as one segment.
pub const WHOLE_TEXT: SplitStrategy = SplitStrategy::new("whole_text", split_whole_text);

/// Ordered list of strategies with an acceptability predicate.
#[derive(Debug, Clone)]
pub struct Cascade {
    strategies: Vec<SplitStrategy>,
    min_segments: usize,
}

impl Cascade {
    /// Create a cascade accepting any non-empty result.
    pub fn new(strategies: Vec<SplitStrategy>) -> Self {
        Self {
            strategies,
            min_segments: 1,
        }
    }

    /// The cascade used by the sentence segmenter when its primary path fails.
    pub fn sentence_fallback() -> Self {
        Self::new(vec![PARAGRAPHS, LINES, FIXED_BLOCKS, WHOLE_TEXT])
    }

    /// Require at least `min_segments` non-blank segments.
    pub fn with_min_segments(mut self, min_segments: usize) -> Self {
        self.min_segments = min_segments.max(1);
        self
    }

    /// Names of the strategies, in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }

    /// Whether a strategy's output is good enough to stop the cascade.
    pub fn is_acceptable(&self, segments: &[String]) -> bool {
        segments.iter().filter(|s| !s.trim().is_empty()).count() >= self.min_segments
    }

    /// Run the strategies in order and return the first acceptable result.
    ///
    /// Segments are trimmed and blank ones dropped. Returns the winning
    /// strategy name, or `None` with an empty list if nothing was acceptable.
    pub fn run(&self, text: &str, params: &FallbackParams) -> (Option<&'static str>, Vec<String>) {
        for strategy in &self.strategies {
            let segments: Vec<String> = (strategy.split)(text, params)
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();

            if self.is_acceptable(&segments) {
                debug!(
                    strategy = strategy.name,
                    segments = segments.len(),
                    "Fallback strategy accepted"
                );
                return (Some(strategy.name), segments);
            }
            debug!(strategy = strategy.name, "Fallback strategy rejected");
        }
        (None, Vec::new())
    }
}

fn split_paragraphs(text: &str, _params: &FallbackParams) -> Vec<String> {
    text.split("\n\n").map(String::from).collect()
}

fn split_lines(text: &str, _params: &FallbackParams) -> Vec<String> {
    text.lines().map(String::from).collect()
}

fn split_fixed_blocks(text: &str, params: &FallbackParams) -> Vec<String> {
    block_slices(text, params.block_size, 0)
}

fn split_whole_text(text: &str, _params: &FallbackParams) -> Vec<String> {
    vec![text.to_string()]
}

/// Slice text into fixed-size character blocks with overlap.
///
/// Each block ends at the last whitespace inside the block when there is
/// one, otherwise it is cut hard at `block_size` characters. The next block
/// starts `overlap` characters before the previous cut but always strictly
/// after the previous start, so the loop terminates for any input.
pub fn block_slices(text: &str, block_size: usize, overlap: usize) -> Vec<String> {
    let block_size = block_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut blocks = Vec::new();
    let mut start = 0;

    while start < total {
        let end = (start + block_size).min(total);

        if end == total {
            push_block(&mut blocks, &chars[start..end]);
            break;
        }

        // Prefer a cut at the nearest preceding whitespace
        let cut = chars[start + 1..end]
            .iter()
            .rposition(|c| c.is_whitespace())
            .map(|pos| start + 1 + pos)
            .unwrap_or(end);

        push_block(&mut blocks, &chars[start..cut]);

        let mut next = cut.saturating_sub(overlap).max(start + 1);
        // Start the overlap on a word boundary when one is available
        if next < cut && !chars[next - 1].is_whitespace() {
            if let Some(pos) = chars[next..cut].iter().position(|c| c.is_whitespace()) {
                next += pos + 1;
            }
        }
        start = next;
    }

    blocks
}

fn push_block(blocks: &mut Vec<String>, chars: &[char]) {
    let block: String = chars.iter().collect();
    let trimmed = block.trim();
    if !trimmed.is_empty() {
        blocks.push(trimmed.to_string());
    }
}
