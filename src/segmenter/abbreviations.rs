//! Abbreviation protection for sentence splitting.
//!
//! Abbreviation periods are hidden behind indexed placeholders before the
//! boundary regex runs. The placeholder map lives in an [`AbbreviationGuard`]
//! built fresh for each call, so segmenters can be shared across threads.

use std::collections::BTreeSet;

use anyhow::{anyhow, Result};
use regex::Regex;

/// Abbreviations whose periods never end a sentence.
///
/// These always precede their referent ("art. 5", "dott. Rossi").
pub const DEFAULT_BOUND_ABBREVIATIONS: &[&str] = &[
    "art.", "artt.", "n.", "nn.", "p.", "pp.", "pag.", "pagg.", "cfr.", "sig.", "sigg.",
    "dott.", "avv.", "prof.", "ing.", "on.", "lett.", "par.", "cap.", "vol.", "sez.", "cass.",
    "trib.", "d.lgs.", "d.l.", "d.p.r.", "d.m.", "l.", "reg.", "dir.", "op.", "v.", "all.",
    "cod.", "c.d.", "cd.", "rv.", "es.", "p.es.", "sent.", "ord.", "ric.", "proc.", "rel.",
    "pres.", "cons.", "rep.", "ult.", "co.", "civ.", "pen.", "app.", "amm.", "un.", "g.u.",
];

/// Abbreviations that may also close a sentence.
///
/// Their inner periods are protected; the final period stays visible to the
/// boundary regex, so "... c.c. Il contratto" still splits before "Il".
pub const DEFAULT_TERMINAL_ABBREVIATIONS: &[&str] = &[
    "c.c.", "c.p.", "c.p.c.", "c.p.p.", "cost.", "ecc.", "etc.", "s.p.a.", "s.r.l.", "s.n.c.",
    "s.a.s.", "cit.", "ss.",
];

/// Placeholder delimiter pairs, tried in order until one is absent from the text.
const DELIMITERS: &[(char, char)] = &[
    ('\u{E000}', '\u{E001}'),
    ('\u{E002}', '\u{E003}'),
    ('\u{F8F0}', '\u{F8F1}'),
    ('\u{FFF0}', '\u{FFF1}'),
];

/// Compiled set of abbreviations.
#[derive(Debug, Clone)]
pub struct AbbreviationSet {
    pattern: Regex,
    terminal: BTreeSet<String>,
}

impl AbbreviationSet {
    /// Build a set from bound and terminal abbreviations.
    ///
    /// Matching is case-insensitive and anchored at a word boundary.
    pub fn new<B, T>(bound: B, terminal: T) -> Result<Self>
    where
        B: IntoIterator,
        B::Item: AsRef<str>,
        T: IntoIterator,
        T::Item: AsRef<str>,
    {
        let terminal: BTreeSet<String> = terminal
            .into_iter()
            .map(|a| a.as_ref().to_lowercase())
            .collect();
        let mut all: Vec<String> = bound
            .into_iter()
            .map(|a| a.as_ref().to_lowercase())
            .filter(|a| !terminal.contains(a))
            .chain(terminal.iter().cloned())
            .filter(|a| !a.is_empty())
            .collect();
        if all.is_empty() {
            return Err(anyhow!("abbreviation set is empty"));
        }

        // Longest first so "c.p.c." wins over "c.p."
        all.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        all.dedup();

        let alternation = all
            .iter()
            .map(|a| regex::escape(a))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})", alternation))?;

        Ok(Self { pattern, terminal })
    }

    /// Default Italian legal abbreviations plus custom bound ones.
    pub fn with_custom<I>(custom: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let bound = DEFAULT_BOUND_ABBREVIATIONS
            .iter()
            .map(|a| a.to_string())
            .chain(custom.into_iter().map(|a| a.as_ref().trim().to_string()));
        Self::new(bound, DEFAULT_TERMINAL_ABBREVIATIONS)
    }

    /// Replace every abbreviation in `text` with an indexed placeholder.
    ///
    /// Fails only when every delimiter pair already occurs in the text.
    pub fn protect(&self, text: &str) -> Result<AbbreviationGuard> {
        let (open, close) = DELIMITERS
            .iter()
            .copied()
            .find(|(open, close)| !text.contains(*open) && !text.contains(*close))
            .ok_or_else(|| anyhow!("no placeholder delimiter is free in the input"))?;

        let mut originals = Vec::new();
        let mut protected = String::with_capacity(text.len());
        let mut last = 0;

        for m in self.pattern.find_iter(text) {
            protected.push_str(&text[last..m.start()]);
            let matched = m.as_str();
            let is_terminal = self.terminal.contains(&matched.to_lowercase());

            // Terminal abbreviations keep their final period outside the placeholder
            let hidden = if is_terminal {
                &matched[..matched.len() - 1]
            } else {
                matched
            };
            protected.push(open);
            protected.push_str(&originals.len().to_string());
            protected.push(close);
            if is_terminal {
                protected.push('.');
            }
            originals.push(hidden.to_string());
            last = m.end();
        }
        protected.push_str(&text[last..]);

        Ok(AbbreviationGuard {
            protected,
            originals,
            open,
            close,
        })
    }
}

/// Per-call placeholder map produced by [`AbbreviationSet::protect`].
#[derive(Debug)]
pub struct AbbreviationGuard {
    protected: String,
    originals: Vec<String>,
    open: char,
    close: char,
}

impl AbbreviationGuard {
    /// Text with abbreviations replaced by placeholders.
    pub fn protected(&self) -> &str {
        &self.protected
    }

    /// Number of protected occurrences.
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    /// Whether the text contained no abbreviations.
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// First visible character of `fragment`, looking through a leading placeholder.
    pub fn leading_char(&self, fragment: &str) -> Option<char> {
        let mut chars = fragment.chars();
        let first = chars.next()?;
        if first != self.open {
            return Some(first);
        }
        let digits: String = chars.take_while(|c| c.is_ascii_digit()).collect();
        digits
            .parse::<usize>()
            .ok()
            .and_then(|i| self.originals.get(i))
            .and_then(|original| original.chars().next())
    }

    /// Put the original abbreviations back into a fragment of the protected text.
    pub fn restore(&self, fragment: &str) -> String {
        if self.originals.is_empty() || !fragment.contains(self.open) {
            return fragment.to_string();
        }

        let mut restored = String::with_capacity(fragment.len());
        let mut rest = fragment;
        while let Some(pos) = rest.find(self.open) {
            restored.push_str(&rest[..pos]);
            let after = &rest[pos + self.open.len_utf8()..];
            let digits_len = after.find(|c: char| !c.is_ascii_digit()).unwrap_or(after.len());
            let original = after[..digits_len]
                .parse::<usize>()
                .ok()
                .and_then(|i| self.originals.get(i));

            match (original, after[digits_len..].strip_prefix(self.close)) {
                (Some(original), Some(tail)) => {
                    restored.push_str(original);
                    rest = tail;
                }
                _ => {
                    // Placeholder cut in half: keep the raw delimiter
                    restored.push(self.open);
                    rest = after;
                }
            }
        }
        restored.push_str(rest);
        restored
    }
}
