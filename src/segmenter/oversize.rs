//! Hierarchical subdivision of over-long sentences.

use unicode_segmentation::UnicodeSegmentation;

/// Splits a sentence that exceeds a character limit.
///
/// Tries separators in order of preference:
/// 1. Semicolons
/// 2. Colons
/// 3. Commas
/// 4. Word boundaries
/// 5. Characters (a single word longer than the limit)
///
/// Each level only runs on the pieces the previous level left too long.
/// Separators stay attached to the piece they end, and only whitespace at
/// the cut points is dropped.
#[derive(Debug, Clone)]
pub struct OversizeSplitter {
    separators: Vec<char>,
}

impl OversizeSplitter {
    pub fn new() -> Self {
        Self {
            separators: vec![';', ':', ','],
        }
    }

    /// Create a splitter with custom separators.
    pub fn with_separators(separators: Vec<char>) -> Self {
        Self { separators }
    }

    /// Split `sentence` into fragments of at most `limit` characters.
    pub fn split(&self, sentence: &str, limit: usize) -> Vec<String> {
        let limit = limit.max(1);
        let trimmed = sentence.trim();
        if trimmed.is_empty() {
            return vec![];
        }
        if char_len(trimmed) <= limit {
            return vec![trimmed.to_string()];
        }
        self.split_at_level(trimmed, limit, 0)
    }

    fn split_at_level(&self, text: &str, limit: usize, level: usize) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return vec![];
        }
        if char_len(trimmed) <= limit {
            return vec![trimmed.to_string()];
        }

        // Separators exhausted, fall back to words
        let Some(&separator) = self.separators.get(level) else {
            return split_words(trimmed, limit);
        };

        let pieces: Vec<&str> = trimmed.split_inclusive(separator).collect();
        if pieces.len() <= 1 {
            return self.split_at_level(trimmed, limit, level + 1);
        }

        let mut fragments = Vec::new();
        let mut current = String::new();

        for piece in pieces {
            let candidate = format!("{}{}", current, piece);
            if char_len(candidate.trim()) <= limit {
                current = candidate;
                continue;
            }

            flush(&mut fragments, &mut current);

            if char_len(piece.trim()) > limit {
                fragments.extend(self.split_at_level(piece, limit, level + 1));
            } else {
                current = piece.to_string();
            }
        }
        flush(&mut fragments, &mut current);

        fragments
    }
}

impl Default for OversizeSplitter {
    fn default() -> Self {
        Self::new()
    }
}

fn flush(fragments: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        fragments.push(trimmed.to_string());
    }
    current.clear();
}

/// Pack words into fragments of at most `limit` characters.
fn split_words(text: &str, limit: usize) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut current = String::new();

    for token in text.split_word_bounds() {
        let candidate = format!("{}{}", current, token);
        if char_len(candidate.trim()) <= limit {
            current = candidate;
            continue;
        }

        flush(&mut fragments, &mut current);

        if char_len(token.trim()) > limit {
            fragments.extend(hard_cut(token.trim(), limit));
        } else if !token.trim().is_empty() {
            current = token.to_string();
        }
    }
    flush(&mut fragments, &mut current);

    fragments
}

/// Cut a single word into `limit`-character pieces.
fn hard_cut(word: &str, limit: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(limit)
        .map(|piece| piece.iter().collect::<String>())
        .collect()
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
