//! Configuration types for chunking.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{ConfigError, Result};
use crate::{
    DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_TOKENS, DEFAULT_MIN_CHUNK_SIZE, DEFAULT_MIN_TOKENS,
    DEFAULT_OVERLAP_SIZE, DEFAULT_OVERLAP_TOKENS,
};

/// Environment variable prefix for layered settings.
const ENV_PREFIX: &str = "LEXCHUNK";

/// How sentences are packed into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkMode {
    /// Character budget, overlapping windows of whole sentences
    SlidingWindow,
    /// Character budget, greedy non-overlapping packing
    Paragraph,
    /// Token budget with synthetic overlap chunks between primaries
    HybridTokenBudget,
}

impl ChunkMode {
    /// All modes, in routing order.
    pub const ALL: [ChunkMode; 3] = [
        ChunkMode::SlidingWindow,
        ChunkMode::Paragraph,
        ChunkMode::HybridTokenBudget,
    ];

    /// Separator placed between sentences of one chunk.
    pub fn joiner(&self) -> &'static str {
        match self {
            ChunkMode::SlidingWindow | ChunkMode::Paragraph => " ",
            ChunkMode::HybridTokenBudget => "\n",
        }
    }

    /// Whether sizes are measured in tokens rather than characters.
    pub fn is_token_budget(&self) -> bool {
        matches!(self, ChunkMode::HybridTokenBudget)
    }
}

impl fmt::Display for ChunkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkMode::SlidingWindow => write!(f, "sliding_window"),
            ChunkMode::Paragraph => write!(f, "paragraph"),
            ChunkMode::HybridTokenBudget => write!(f, "hybrid_token_budget"),
        }
    }
}

impl FromStr for ChunkMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sliding_window" | "sliding" | "window" => Ok(ChunkMode::SlidingWindow),
            "paragraph" | "greedy" => Ok(ChunkMode::Paragraph),
            "hybrid_token_budget" | "hybrid" | "token" | "tokens" => {
                Ok(ChunkMode::HybridTokenBudget)
            }
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Configuration for a single chunker instance.
///
/// In character modes the sizes are characters; in
/// [`ChunkMode::HybridTokenBudget`] they are word tokens (`min_tokens`,
/// `max_tokens`, `overlap_tokens`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Smallest acceptable non-terminal chunk
    pub min_chunk_size: usize,

    /// Size budget per chunk
    pub max_chunk_size: usize,

    /// Overlap between consecutive chunks
    pub overlap: usize,

    /// Packing strategy
    pub mode: ChunkMode,

    /// Extra abbreviations whose periods never end a sentence
    #[serde(default)]
    pub custom_abbreviations: BTreeSet<String>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::sliding_window()
    }
}

impl ChunkerConfig {
    /// Character-budget sliding windows with the default sizes.
    pub fn sliding_window() -> Self {
        Self {
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP_SIZE,
            mode: ChunkMode::SlidingWindow,
            custom_abbreviations: BTreeSet::new(),
        }
    }

    /// Greedy character-budget packing with the default sizes.
    pub fn paragraph() -> Self {
        Self {
            mode: ChunkMode::Paragraph,
            overlap: 0,
            ..Self::sliding_window()
        }
    }

    /// Token-budget packing with overlap chunks and the default token sizes.
    pub fn hybrid() -> Self {
        Self {
            min_chunk_size: DEFAULT_MIN_TOKENS,
            max_chunk_size: DEFAULT_MAX_TOKENS,
            overlap: DEFAULT_OVERLAP_TOKENS,
            mode: ChunkMode::HybridTokenBudget,
            custom_abbreviations: BTreeSet::new(),
        }
    }

    /// Default configuration for the given mode.
    pub fn for_mode(mode: ChunkMode) -> Self {
        match mode {
            ChunkMode::SlidingWindow => Self::sliding_window(),
            ChunkMode::Paragraph => Self::paragraph(),
            ChunkMode::HybridTokenBudget => Self::hybrid(),
        }
    }

    /// Set min and max sizes.
    pub fn with_sizes(mut self, min: usize, max: usize) -> Self {
        self.min_chunk_size = min;
        self.max_chunk_size = max;
        self
    }

    /// Set the overlap.
    pub fn with_overlap(mut self, overlap: usize) -> Self {
        self.overlap = overlap;
        self
    }

    /// Add a custom abbreviation (e.g. `"sent."`).
    pub fn with_abbreviation(mut self, abbreviation: &str) -> Self {
        self.custom_abbreviations.insert(abbreviation.trim().to_string());
        self
    }

    /// Check the configuration for contradictions.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(ConfigError::ZeroMaxSize);
        }
        if self.min_chunk_size > self.max_chunk_size {
            return Err(ConfigError::MinExceedsMax {
                min: self.min_chunk_size,
                max: self.max_chunk_size,
            });
        }
        // Sentences are capped at max / 2, so a larger min could force a
        // chunk past max before it is allowed to close
        if !self.mode.is_token_budget() && self.min_chunk_size > self.max_chunk_size / 2 {
            return Err(ConfigError::MinAboveHalfMax {
                min: self.min_chunk_size,
                max: self.max_chunk_size,
            });
        }
        if self.overlap >= self.max_chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.overlap,
                max: self.max_chunk_size,
            });
        }
        for abbreviation in &self.custom_abbreviations {
            if abbreviation.len() < 2
                || !abbreviation.ends_with('.')
                || abbreviation.chars().any(char::is_whitespace)
            {
                return Err(ConfigError::InvalidAbbreviation(abbreviation.clone()));
            }
        }
        Ok(())
    }

    /// Longest sentence the segmenter should keep whole.
    ///
    /// Character modes cap sentences at half the chunk budget; the token
    /// budget mode keeps sentences whole and lets the packer isolate them.
    pub fn max_sentence_chars(&self) -> Option<usize> {
        if self.mode.is_token_budget() {
            None
        } else {
            Some((self.max_chunk_size / 2).max(1))
        }
    }
}

/// Service-level chunking settings.
///
/// Holds the defaults every mode is built from, plus knobs for the batch
/// driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Character budget for sliding-window and paragraph chunkers
    pub max_chunk_size: usize,

    /// Minimum non-terminal chunk size in characters
    pub min_chunk_size: usize,

    /// Sliding-window overlap in characters
    pub overlap_size: usize,

    /// Token budget for the hybrid chunker
    pub max_tokens: usize,

    /// Minimum primary/overlap chunk size in tokens
    pub min_tokens: usize,

    /// Overlap size in tokens
    pub overlap_tokens: usize,

    /// Mode used when the caller does not pick one
    pub default_mode: ChunkMode,

    /// Extra abbreviations applied to every chunker
    pub custom_abbreviations: Vec<String>,

    /// Documents chunked concurrently by the batch processor
    pub max_concurrent_documents: usize,

    /// Active chunking profile name
    pub active_profile: String,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
            overlap_size: DEFAULT_OVERLAP_SIZE,
            max_tokens: DEFAULT_MAX_TOKENS,
            min_tokens: DEFAULT_MIN_TOKENS,
            overlap_tokens: DEFAULT_OVERLAP_TOKENS,
            default_mode: ChunkMode::SlidingWindow,
            custom_abbreviations: Vec::new(),
            max_concurrent_documents: 4,
            active_profile: "sliding_window".to_string(),
        }
    }
}

impl ChunkingSettings {
    /// Load settings from `.env` and `LEXCHUNK_*` environment variables.
    ///
    /// Malformed values are logged and replaced by the defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::load(None).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid chunking settings in environment, using defaults");
            Self::default()
        })
    }

    /// Layer defaults, an optional settings file and the environment.
    ///
    /// The file format is inferred from its extension (TOML, JSON, YAML...).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("custom_abbreviations"),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Build a validated chunker configuration for the given mode.
    pub fn config_for(&self, mode: ChunkMode) -> Result<ChunkerConfig> {
        let base = match mode {
            ChunkMode::SlidingWindow => ChunkerConfig::sliding_window()
                .with_sizes(self.min_chunk_size, self.max_chunk_size)
                .with_overlap(self.overlap_size),
            ChunkMode::Paragraph => ChunkerConfig::paragraph()
                .with_sizes(self.min_chunk_size, self.max_chunk_size),
            ChunkMode::HybridTokenBudget => ChunkerConfig::hybrid()
                .with_sizes(self.min_tokens, self.max_tokens)
                .with_overlap(self.overlap_tokens),
        };
        let config = self
            .custom_abbreviations
            .iter()
            .fold(base, |config, abbreviation| config.with_abbreviation(abbreviation));
        config.validate()?;
        Ok(config)
    }

    /// Configuration of the active profile, falling back to the default mode.
    pub fn active_config(&self) -> Result<ChunkerConfig> {
        match ChunkingProfile::defaults()
            .into_iter()
            .find(|p| p.name == self.active_profile)
        {
            Some(profile) => {
                let config = self
                    .custom_abbreviations
                    .iter()
                    .fold(profile.to_config(), |config, a| config.with_abbreviation(a));
                config.validate()?;
                Ok(config)
            }
            None => self.config_for(self.default_mode),
        }
    }
}

/// A named chunking profile with preset configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingProfile {
    /// Profile name
    pub name: String,

    /// Profile description
    pub description: String,

    /// Packing mode
    pub mode: ChunkMode,

    /// Minimum chunk size (characters or tokens, depending on mode)
    pub min_chunk_size: usize,

    /// Maximum chunk size (characters or tokens, depending on mode)
    pub max_chunk_size: usize,

    /// Overlap (characters or tokens, depending on mode)
    pub overlap: usize,
}

impl ChunkingProfile {
    /// Create default profiles.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                name: "sliding_window".to_string(),
                description: "Overlapping sentence windows for retrieval".to_string(),
                mode: ChunkMode::SlidingWindow,
                min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
                max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
                overlap: DEFAULT_OVERLAP_SIZE,
            },
            Self {
                name: "paragraph".to_string(),
                description: "Non-overlapping greedy packing for annotation".to_string(),
                mode: ChunkMode::Paragraph,
                min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
                max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
                overlap: 0,
            },
            Self {
                name: "hybrid".to_string(),
                description: "Token-budget chunks with explicit overlap chunks".to_string(),
                mode: ChunkMode::HybridTokenBudget,
                min_chunk_size: DEFAULT_MIN_TOKENS,
                max_chunk_size: DEFAULT_MAX_TOKENS,
                overlap: DEFAULT_OVERLAP_TOKENS,
            },
            Self {
                name: "fine".to_string(),
                description: "Small sliding windows for fine-grained retrieval".to_string(),
                mode: ChunkMode::SlidingWindow,
                min_chunk_size: 100,
                max_chunk_size: 500,
                overlap: 100,
            },
        ]
    }

    /// Resolve the profile into a chunker configuration.
    pub fn to_config(&self) -> ChunkerConfig {
        ChunkerConfig::for_mode(self.mode)
            .with_sizes(self.min_chunk_size, self.max_chunk_size)
            .with_overlap(self.overlap)
    }
}
