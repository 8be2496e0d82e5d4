//! Core types for the chunker.

mod chunk;
mod config;
mod document;
pub mod error;

pub use chunk::{chunk_id, Chunk, ChunkMetadata};
pub use config::{ChunkMode, ChunkerConfig, ChunkingProfile, ChunkingSettings};
pub use document::{Document, DocumentResult};
pub use error::ConfigError;
