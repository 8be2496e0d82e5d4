//! Sentence segmentation for Italian legal prose.
//!
//! The segmenter turns raw text into an ordered list of trimmed sentences:
//!
//! 1. Abbreviations are hidden behind per-call placeholders.
//! 2. Text is split where `.`, `!` or `?` (plus optional closing quotes or
//!    brackets) is followed by whitespace and an uppercase letter or digit.
//! 3. Placeholders are restored.
//! 4. Long texts that barely split are retried with a naive period split.
//! 5. Sentences over the length limit are subdivided by [`OversizeSplitter`].
//! 6. If nothing survives, the [`Cascade`] of cruder strategies takes over.
//!
//! `segment` never fails: internal errors are logged and the cascade's
//! result is returned instead.

mod abbreviations;
mod oversize;

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

pub use abbreviations::{
    AbbreviationGuard, AbbreviationSet, DEFAULT_BOUND_ABBREVIATIONS,
    DEFAULT_TERMINAL_ABBREVIATIONS,
};
pub use oversize::OversizeSplitter;

use crate::fallback::{Cascade, FallbackParams};
use crate::types::ChunkerConfig;
use crate::DEFAULT_MAX_CHUNK_SIZE;
use oversize::char_len;

/// At most this many primary segments triggers the naive period split...
const NAIVE_SPLIT_MAX_SEGMENTS: usize = 3;
/// ...but only for texts longer than this many characters.
const NAIVE_SPLIT_MIN_CHARS: usize = 1000;
/// A naive fragment must be longer than this to open a new sentence.
const NAIVE_SPLIT_MIN_FRAGMENT: usize = 10;

lazy_static! {
    static ref BOUNDARY: Regex = Regex::new(r#"[.!?]["'»”’)\]]*\s+"#).unwrap();
}

/// Abbreviation-aware sentence segmenter.
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    /// A build error is reported by `segment`, inside the caller's log sink
    abbreviations: std::result::Result<AbbreviationSet, String>,
    oversize: OversizeSplitter,
    max_sentence_chars: Option<usize>,
    fallback_block_size: usize,
    cascade: Cascade,
}

impl SentenceSegmenter {
    /// Create a segmenter with the default abbreviations and no length limit.
    pub fn new() -> Self {
        Self::with_abbreviations(Vec::<String>::new())
    }

    /// Create a segmenter with extra bound abbreviations.
    pub fn with_abbreviations<I>(custom: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self::from_abbreviation_set(AbbreviationSet::with_custom(custom))
    }

    fn from_abbreviation_set(abbreviations: Result<AbbreviationSet>) -> Self {
        Self {
            abbreviations: abbreviations.map_err(|e| e.to_string()),
            oversize: OversizeSplitter::new(),
            max_sentence_chars: None,
            fallback_block_size: DEFAULT_MAX_CHUNK_SIZE,
            cascade: Cascade::sentence_fallback(),
        }
    }

    /// Create a segmenter matching a chunker configuration.
    pub fn from_config(config: &ChunkerConfig) -> Self {
        let block = config
            .max_sentence_chars()
            .unwrap_or(DEFAULT_MAX_CHUNK_SIZE);
        Self::with_abbreviations(&config.custom_abbreviations)
            .with_max_sentence_chars(config.max_sentence_chars())
            .with_fallback_block_size(block)
    }

    /// Subdivide sentences longer than `limit` characters.
    pub fn with_max_sentence_chars(mut self, limit: Option<usize>) -> Self {
        self.max_sentence_chars = limit.map(|l| l.max(1));
        self
    }

    /// Block width used by the fixed-block fallback.
    pub fn with_fallback_block_size(mut self, block_size: usize) -> Self {
        self.fallback_block_size = block_size.max(1);
        self
    }

    /// Split text into trimmed, non-empty sentences.
    ///
    /// Blank input yields an empty list.
    pub fn segment(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        match self.try_segment(text) {
            Ok(sentences) if !sentences.is_empty() => sentences,
            Ok(_) => {
                debug!("Primary segmentation produced no sentences, running fallback cascade");
                self.run_cascade(text)
            }
            Err(e) => {
                warn!(error = %e, "Sentence segmentation failed, running fallback cascade");
                self.run_cascade(text)
            }
        }
    }

    fn try_segment(&self, text: &str) -> Result<Vec<String>> {
        let abbreviations = self
            .abbreviations
            .as_ref()
            .map_err(|e| anyhow::anyhow!("abbreviation protection disabled: {}", e))?;
        let guard = abbreviations.protect(text)?;

        let mut segments = split_on_boundaries(&guard);
        if segments.len() <= NAIVE_SPLIT_MAX_SEGMENTS && char_len(text) > NAIVE_SPLIT_MIN_CHARS {
            let naive = split_on_periods(&guard);
            if naive.len() > segments.len() {
                debug!(
                    primary = segments.len(),
                    naive = naive.len(),
                    "Using naive period split"
                );
                segments = naive;
            }
        }

        let sentences = segments
            .iter()
            .map(|segment| guard.restore(segment).trim().to_string())
            .filter(|sentence| !sentence.is_empty());

        let sentences = match self.max_sentence_chars {
            Some(limit) => sentences
                .flat_map(|sentence| self.oversize.split(&sentence, limit))
                .collect(),
            None => sentences.collect(),
        };

        Ok(sentences)
    }

    fn run_cascade(&self, text: &str) -> Vec<String> {
        let params = FallbackParams::new(self.fallback_block_size, 0);
        let (strategy, segments) = self.cascade.run(text, &params);
        debug!(
            strategy = strategy.unwrap_or("none"),
            segments = segments.len(),
            "Fallback cascade finished"
        );
        segments
    }
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

/// Primary split: punctuation + whitespace followed by an uppercase letter or digit.
fn split_on_boundaries(guard: &AbbreviationGuard) -> Vec<String> {
    let text = guard.protected();
    let mut segments = Vec::new();
    let mut last = 0;

    for m in BOUNDARY.find_iter(text) {
        let opens_sentence = guard
            .leading_char(&text[m.end()..])
            .map_or(false, |c| c.is_uppercase() || c.is_ascii_digit());
        if !opens_sentence {
            continue;
        }
        push_trimmed(&mut segments, &text[last..m.end()]);
        last = m.end();
    }
    push_trimmed(&mut segments, &text[last..]);

    segments
}

/// Naive split on literal periods.
///
/// A period opens a new sentence only if the following fragment starts with
/// an uppercase letter and is longer than [`NAIVE_SPLIT_MIN_FRAGMENT`]
/// characters; otherwise the fragment is merged into the previous one.
fn split_on_periods(guard: &AbbreviationGuard) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();

    for fragment in guard.protected().split_inclusive('.') {
        let trimmed = fragment.trim();
        let opens_sentence = !current.trim().is_empty()
            && char_len(&guard.restore(trimmed)) > NAIVE_SPLIT_MIN_FRAGMENT
            && guard.leading_char(trimmed).map_or(false, char::is_uppercase);

        if opens_sentence {
            push_trimmed(&mut segments, &current);
            current.clear();
        }
        current.push_str(fragment);
    }
    push_trimmed(&mut segments, &current);

    segments
}

fn push_trimmed(segments: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_abbreviations_do_not_split() {
        let segmenter = SentenceSegmenter::new();
        let sentences = segmenter.segment("Vedi art. 1414 c.c. Il contratto è valido.");
        assert_eq!(sentences, vec!["Vedi art. 1414 c.c.", "Il contratto è valido."]);
    }

    #[test]
    fn test_basic_punctuation() {
        let segmenter = SentenceSegmenter::new();
        let sentences = segmenter.segment("Primo periodo. Secondo periodo! Terzo? 4 è un numero.");
        assert_eq!(
            sentences,
            vec!["Primo periodo.", "Secondo periodo!", "Terzo?", "4 è un numero."]
        );
    }

    #[test]
    fn test_lowercase_continuation_not_split() {
        let segmenter = SentenceSegmenter::new();
        let sentences = segmenter.segment("Il termine è di 30 gg. dalla notifica. Poi decorre.");
        assert_eq!(
            sentences,
            vec!["Il termine è di 30 gg. dalla notifica.", "Poi decorre."]
        );
    }

    #[test]
    fn test_closing_quotes_stay_with_sentence() {
        let segmenter = SentenceSegmenter::new();
        let sentences = segmenter.segment("Disse: «Il fatto non sussiste.» La corte concorda.");
        assert_eq!(
            sentences,
            vec!["Disse: «Il fatto non sussiste.»", "La corte concorda."]
        );
    }

    #[test]
    fn test_sentence_starting_with_abbreviation() {
        let segmenter = SentenceSegmenter::new();
        let sentences = segmenter.segment("La causa è rinviata. Art. 5 della legge applicabile.");
        assert_eq!(
            sentences,
            vec!["La causa è rinviata.", "Art. 5 della legge applicabile."]
        );
    }

    #[test]
    fn test_court_citations_do_not_split() {
        let segmenter = SentenceSegmenter::new();
        assert_eq!(
            segmenter.segment(
                "Si veda Cass. civ. Sez. Un. n. 1234/2019 sul punto. Il ricorso è respinto."
            ),
            vec![
                "Si veda Cass. civ. Sez. Un. n. 1234/2019 sul punto.",
                "Il ricorso è respinto."
            ]
        );
        assert_eq!(
            segmenter.segment("Conforme Cass. pen. Sez. III n. 88/2020. Nulla da aggiungere."),
            vec!["Conforme Cass. pen. Sez. III n. 88/2020.", "Nulla da aggiungere."]
        );
        assert_eq!(
            segmenter.segment("Pubblicato in G.U. Serie generale n. 5. Entra in vigore subito."),
            vec!["Pubblicato in G.U. Serie generale n. 5.", "Entra in vigore subito."]
        );
    }

    #[test]
    fn test_empty_and_blank() {
        let segmenter = SentenceSegmenter::new();
        assert!(segmenter.segment("").is_empty());
        assert!(segmenter.segment("   \n\t ").is_empty());
    }

    #[test]
    fn test_no_punctuation() {
        let segmenter = SentenceSegmenter::new();
        assert_eq!(segmenter.segment("  testo senza punteggiatura  "), vec!["testo senza punteggiatura"]);
    }

    #[test]
    fn test_naive_split_for_long_text() {
        let segmenter = SentenceSegmenter::new();
        // Periods followed directly by the next word defeat the primary regex
        let sentence = "Questa frase descrive un fatto rilevante per la causa";
        let text = vec![sentence; 30].join(".");
        assert!(text.chars().count() > 1000);

        let sentences = segmenter.segment(&text);
        assert_eq!(sentences.len(), 30);
        assert!(sentences[0].ends_with('.'));
    }

    #[test]
    fn test_naive_split_merges_short_fragments() {
        let segmenter = SentenceSegmenter::new();
        let long = "Una frase abbastanza lunga da superare il limite";
        let text = format!("{}.Breve.{}", long, vec![long; 25].join("."));
        let sentences = segmenter.segment(&text);
        // "Breve." (6 chars) is merged into the preceding sentence
        assert!(sentences[0].ends_with("limite.Breve."));
    }

    #[test]
    fn test_oversized_sentence_subdivided() {
        let segmenter = SentenceSegmenter::new().with_max_sentence_chars(Some(40));
        let text = "Il giudice, esaminati gli atti, rilevato che il ricorso è tardivo; dichiara inammissibile.";
        let sentences = segmenter.segment(text);
        assert!(sentences.len() > 1);
        for sentence in &sentences {
            assert!(sentence.chars().count() <= 40, "too long: {}", sentence);
        }
    }

    #[test]
    fn test_cascade_when_protection_fails() {
        let segmenter = SentenceSegmenter::new();
        let text = "\u{E000}\u{E002}\u{F8F0}\u{FFF0} primo\n\nsecondo paragrafo";
        let sentences = segmenter.segment(text);
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1], "secondo paragrafo");
    }

    #[test]
    fn test_naive_split_measures_restored_fragment() {
        let segmenter = SentenceSegmenter::new();
        let long = "Una frase abbastanza lunga da superare il limite";
        // "Art. 1 cit." is 11 characters, but only 10 while its abbreviations are hidden
        let text = format!("{}.Art. 1 cit.{}", long, vec![long; 25].join("."));
        let sentences = segmenter.segment(&text);
        assert_eq!(sentences[1], "Art. 1 cit.");
    }

    #[test]
    fn test_abbreviation_failure_logged_to_sink() {
        let (dispatch, logs) = crate::telemetry::capture_sink(tracing::Level::WARN);
        let segmenter = SentenceSegmenter::from_abbreviation_set(AbbreviationSet::new(
            Vec::<String>::new(),
            Vec::<String>::new(),
        ));
        assert!(!logs.contains("abbreviation"));

        let sentences = tracing::dispatcher::with_default(&dispatch, || {
            segmenter.segment("primo paragrafo\n\nsecondo paragrafo")
        });
        assert_eq!(sentences, vec!["primo paragrafo", "secondo paragrafo"]);
        assert!(logs.contains("abbreviation protection disabled"));
        assert!(logs.contains("abbreviation set is empty"));
    }

    #[test]
    fn test_from_config_uses_custom_abbreviations() {
        let config = ChunkerConfig::paragraph().with_abbreviation("racc.");
        let segmenter = SentenceSegmenter::from_config(&config);
        let sentences = segmenter.segment("Vedi racc. Rossi per i dettagli. Fine.");
        assert_eq!(sentences, vec!["Vedi racc. Rossi per i dettagli.", "Fine."]);
    }
}
