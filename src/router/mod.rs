//! Chunking strategy router.

use std::sync::Arc;

use tracing::Dispatch;

use crate::chunkers::{build_chunker, Chunker};
use crate::types::error::Result;
use crate::types::{ChunkMode, ChunkingSettings, Document};

/// Router that selects the chunker for a document.
///
/// One chunker per mode is built up front from the service settings;
/// documents pick a mode explicitly or get the default one.
pub struct ChunkingRouter {
    /// Sliding-window chunker (overlapping windows)
    sliding_window: Arc<dyn Chunker>,
    /// Paragraph chunker (greedy, no overlap)
    paragraph: Arc<dyn Chunker>,
    /// Hybrid chunker (token budget with overlap chunks)
    hybrid: Arc<dyn Chunker>,
    /// Mode used for documents without an override
    default_mode: ChunkMode,
}

impl ChunkingRouter {
    /// Create a new chunking router from the given settings.
    pub fn new(settings: &ChunkingSettings) -> Result<Self> {
        Self::build(settings, None)
    }

    /// Create a router whose chunkers all log to `dispatch`.
    pub fn with_log_sink(settings: &ChunkingSettings, dispatch: Dispatch) -> Result<Self> {
        Self::build(settings, Some(dispatch))
    }

    fn build(settings: &ChunkingSettings, log_sink: Option<Dispatch>) -> Result<Self> {
        Ok(Self {
            sliding_window: build_chunker(
                settings.config_for(ChunkMode::SlidingWindow)?,
                log_sink.clone(),
            )?,
            paragraph: build_chunker(settings.config_for(ChunkMode::Paragraph)?, log_sink.clone())?,
            hybrid: build_chunker(settings.config_for(ChunkMode::HybridTokenBudget)?, log_sink)?,
            default_mode: settings.default_mode,
        })
    }

    /// Get the chunker for a mode.
    pub fn get_chunker(&self, mode: ChunkMode) -> Arc<dyn Chunker> {
        match mode {
            ChunkMode::SlidingWindow => Arc::clone(&self.sliding_window),
            ChunkMode::Paragraph => Arc::clone(&self.paragraph),
            ChunkMode::HybridTokenBudget => Arc::clone(&self.hybrid),
        }
    }

    /// Get the chunker for a document, honouring its mode override.
    pub fn chunker_for(&self, document: &Document) -> Arc<dyn Chunker> {
        self.get_chunker(document.mode.unwrap_or(self.default_mode))
    }

    /// Mode used for documents without an override.
    pub fn default_mode(&self) -> ChunkMode {
        self.default_mode
    }

    /// Get a chunker by name or alias ("sliding", "greedy", "tokens", ...).
    pub fn get_chunker_by_name(&self, name: &str) -> Option<Arc<dyn Chunker>> {
        name.parse::<ChunkMode>().ok().map(|mode| self.get_chunker(mode))
    }

    /// List all available chunkers.
    pub fn list_chunkers(&self) -> Vec<(&'static str, &'static str)> {
        ChunkMode::ALL
            .iter()
            .map(|&mode| {
                let chunker = self.get_chunker(mode);
                (chunker.name(), chunker.description())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ChunkingRouter {
        ChunkingRouter::new(&ChunkingSettings::default()).unwrap()
    }

    #[test]
    fn test_default_routing() {
        let router = router();
        let document = Document::new("sentenza", "Testo.");
        assert_eq!(router.chunker_for(&document).name(), "sliding_window");
    }

    #[test]
    fn test_mode_override() {
        let router = router();
        let document = Document::new("sentenza", "Testo.").with_mode(ChunkMode::HybridTokenBudget);
        let chunker = router.chunker_for(&document);
        assert_eq!(chunker.name(), "hybrid");
        assert_eq!(chunker.config().max_chunk_size, crate::DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_lookup_by_name() {
        let router = router();
        assert_eq!(router.get_chunker_by_name("greedy").unwrap().name(), "paragraph");
        assert_eq!(router.get_chunker_by_name("tokens").unwrap().name(), "hybrid");
        assert!(router.get_chunker_by_name("semantic").is_none());
    }

    #[test]
    fn test_list_chunkers() {
        let names: Vec<&str> = router().list_chunkers().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["sliding_window", "paragraph", "hybrid"]);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = ChunkingSettings {
            min_chunk_size: 2000,
            ..Default::default()
        };
        assert!(ChunkingRouter::new(&settings).is_err());
    }
}
