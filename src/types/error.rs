//! Configuration errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while building or loading a chunker configuration.
///
/// Data problems (odd punctuation, empty text, unsplittable tokens) are never
/// reported here; they are absorbed by the fallback cascade.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("min chunk size ({min}) exceeds max chunk size ({max})")]
    MinExceedsMax { min: usize, max: usize },

    #[error("min chunk size ({min}) exceeds half the max chunk size ({max})")]
    MinAboveHalfMax { min: usize, max: usize },

    #[error("max chunk size must be greater than zero")]
    ZeroMaxSize,

    #[error("overlap ({overlap}) must be smaller than max chunk size ({max})")]
    OverlapTooLarge { overlap: usize, max: usize },

    #[error("invalid abbreviation {0:?}: must be non-empty and end with '.'")]
    InvalidAbbreviation(String),

    #[error("unknown chunking mode: {0}")]
    UnknownMode(String),

    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}
