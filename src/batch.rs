//! Batch processing: chunk many documents on a bounded worker pool.
//!
//! Documents are independent, so each one runs on its own blocking task
//! and no state is shared between them. Results come back in input order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::router::ChunkingRouter;
use crate::types::{ChunkMode, Document, DocumentResult};

/// Configuration for batch processing.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum documents chunked concurrently
    pub concurrency: usize,
    /// Whether to continue when a document fails
    pub continue_on_error: bool,
    /// Pause before dispatching each document
    pub throttle: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            continue_on_error: true,
            throttle: None,
        }
    }
}

/// Result of batch processing.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total_documents: usize,
    pub processed_documents: usize,
    pub failed_documents: usize,
    pub total_chunks: usize,
    pub errors: Vec<BatchError>,
    /// Set when the batch stopped early because it was cancelled
    pub cancelled: bool,
}

/// Error during batch processing.
#[derive(Debug, Clone)]
pub struct BatchError {
    pub document: String,
    pub error: String,
}

/// Cooperative cancellation, checked between documents.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Stop dispatching new documents.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one document.
struct Outcome {
    name: String,
    result: std::result::Result<DocumentResult, String>,
}

/// Batch processor for large-scale chunking operations.
pub struct BatchProcessor {
    router: Arc<ChunkingRouter>,
    config: BatchConfig,
    cancellation: CancellationFlag,
}

impl BatchProcessor {
    /// Create a new batch processor.
    pub fn new(router: Arc<ChunkingRouter>, config: BatchConfig) -> Self {
        Self {
            router,
            config,
            cancellation: CancellationFlag::default(),
        }
    }

    /// Handle for cancelling this processor's batches.
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    /// Process a batch of documents and return their chunks in input order.
    pub async fn process_batch(
        &self,
        documents: Vec<Document>,
    ) -> Result<(Vec<DocumentResult>, BatchResult)> {
        let mut summary = BatchResult {
            total_documents: documents.len(),
            ..Default::default()
        };
        let mut results = Vec::with_capacity(documents.len());

        info!(total_documents = summary.total_documents, "Starting batch processing");

        let mut outcomes = Box::pin(self.dispatch(documents));
        while let Some(outcome) = outcomes.next().await {
            if let Some(result) = self.record(outcome, &mut summary)? {
                results.push(result);
            }
        }
        self.finish(&mut summary);

        Ok((results, summary))
    }

    /// Process a batch, sending each document's chunks as soon as it is done.
    pub async fn process_batch_streaming(
        &self,
        documents: Vec<Document>,
        sender: mpsc::Sender<DocumentResult>,
    ) -> Result<BatchResult> {
        let mut summary = BatchResult {
            total_documents: documents.len(),
            ..Default::default()
        };

        let mut outcomes = Box::pin(self.dispatch(documents));
        while let Some(outcome) = outcomes.next().await {
            if let Some(result) = self.record(outcome, &mut summary)? {
                if sender.send(result).await.is_err() {
                    warn!("Receiver dropped, stopping batch processing");
                    break;
                }
            }
        }
        self.finish(&mut summary);

        Ok(summary)
    }

    /// Stream of per-document outcomes, at most `concurrency` in flight.
    fn dispatch(&self, documents: Vec<Document>) -> impl Stream<Item = Outcome> + '_ {
        let cancellation = self.cancellation.clone();
        let throttle = self.config.throttle;

        stream::iter(documents)
            .then(move |document| async move {
                if let Some(pause) = throttle {
                    tokio::time::sleep(pause).await;
                }
                document
            })
            .take_while(move |_| futures::future::ready(!cancellation.is_cancelled()))
            .map(move |document| {
                let chunker = self.router.chunker_for(&document);
                let mode = chunker.config().mode;
                async move {
                    let name = document.name.clone();
                    debug!(document = %name, %mode, "Dispatching document");
                    let joined =
                        tokio::task::spawn_blocking(move || chunker.chunk(&document.text)).await;
                    Outcome {
                        result: joined
                            .map(|chunks| tag_chunks(&name, mode, chunks))
                            .map_err(|e| e.to_string()),
                        name,
                    }
                }
            })
            .buffered(self.config.concurrency.max(1))
    }

    fn record(
        &self,
        outcome: Outcome,
        summary: &mut BatchResult,
    ) -> Result<Option<DocumentResult>> {
        match outcome.result {
            Ok(result) => {
                summary.processed_documents += 1;
                summary.total_chunks += result.chunks.len();
                Ok(Some(result))
            }
            Err(error) => {
                warn!(document = %outcome.name, error = %error, "Failed to chunk document");
                summary.failed_documents += 1;
                if !self.config.continue_on_error {
                    return Err(anyhow!("failed to chunk {}: {}", outcome.name, error));
                }
                summary.errors.push(BatchError {
                    document: outcome.name,
                    error,
                });
                Ok(None)
            }
        }
    }

    fn finish(&self, summary: &mut BatchResult) {
        let handled = summary.processed_documents + summary.failed_documents;
        summary.cancelled = self.cancellation.is_cancelled() && handled < summary.total_documents;

        info!(
            processed = summary.processed_documents,
            failed = summary.failed_documents,
            chunks = summary.total_chunks,
            cancelled = summary.cancelled,
            "Batch processing complete"
        );
    }
}

fn tag_chunks(name: &str, mode: ChunkMode, mut chunks: Vec<crate::types::Chunk>) -> DocumentResult {
    for chunk in &mut chunks {
        chunk.metadata.document = Some(name.to_string());
    }
    DocumentResult {
        name: name.to_string(),
        mode,
        chunks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkingSettings;
    use pretty_assertions::assert_eq;

    fn processor(config: BatchConfig) -> BatchProcessor {
        let router = ChunkingRouter::new(&ChunkingSettings::default()).unwrap();
        BatchProcessor::new(Arc::new(router), config)
    }

    fn documents() -> Vec<Document> {
        vec![
            Document::new("uno", "Prima sentenza. Il ricorso è respinto."),
            Document::new("due", ""),
            Document::new("tre", "Terza sentenza. Le spese seguono la soccombenza.")
                .with_mode(ChunkMode::HybridTokenBudget),
        ]
    }

    #[tokio::test]
    async fn test_process_batch_preserves_order() {
        let processor = processor(BatchConfig {
            concurrency: 2,
            ..Default::default()
        });
        let (results, summary) = processor.process_batch(documents()).await.unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["uno", "due", "tre"]);
        assert_eq!(summary.processed_documents, 3);
        assert_eq!(summary.failed_documents, 0);
        assert!(results[1].chunks.is_empty());
        assert_eq!(results[2].mode, ChunkMode::HybridTokenBudget);
        assert_eq!(results[0].chunks[0].metadata.document.as_deref(), Some("uno"));
        assert_eq!(
            summary.total_chunks,
            results.iter().map(|r| r.chunks.len()).sum::<usize>()
        );
    }

    #[tokio::test]
    async fn test_cancelled_batch_dispatches_nothing() {
        let processor = processor(BatchConfig::default());
        processor.cancellation_flag().cancel();

        let (results, summary) = processor.process_batch(documents()).await.unwrap();
        assert!(results.is_empty());
        assert!(summary.cancelled);
        assert_eq!(summary.total_documents, 3);
    }

    #[tokio::test]
    async fn test_streaming_sends_each_document() {
        let processor = processor(BatchConfig {
            throttle: Some(Duration::from_millis(1)),
            ..Default::default()
        });
        let (sender, mut receiver) = mpsc::channel(8);

        let summary = processor
            .process_batch_streaming(documents(), sender)
            .await
            .unwrap();
        assert_eq!(summary.processed_documents, 3);

        let mut names = Vec::new();
        while let Some(result) = receiver.recv().await {
            names.push(result.name);
        }
        assert_eq!(names, vec!["uno", "due", "tre"]);
    }

    #[test]
    fn test_blocking_driver() {
        let processor = processor(BatchConfig::default());
        let (results, _) =
            tokio_test::block_on(processor.process_batch(documents())).unwrap();
        assert_eq!(results.len(), 3);
    }
}
