//! Document indexing pipeline.
//!
//! Turns a stored document into vectorized chunks:
//!
//! ```text
//! Document ──► chunk_text() ──► ensure_model() ──► transform() per chunk
//!                                                       │
//!                                  save_chunk() + progress update
//!                                                       │
//!                      drop previous chunks ──► mark_indexed() ──► Completed
//! ```
//!
//! The vocabulary is fit on every stored document's content. It is only
//! refit when the corpus fingerprint changes, and refits are serialized so
//! at most one runs at a time. A refit is persisted before it is published. Each run transforms its chunks with one
//! model snapshot and tags them with that snapshot's version.
//!
//! A run that fails or is cancelled removes the chunks it wrote, leaves the
//! document's previous chunks and indexed flag untouched, and emits a
//! terminal `Failed` / `Cancelled` update. Only an unknown document id
//! returns without any update.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use recall_core::chunk::{chunk_text, ChunkParams, TextChunk};
use recall_core::embedding::decode_vector;
use recall_core::error::{RecallError, Result};
use recall_core::models::{now_millis, Document, DocumentChunk, IndexingProgress, ProgressState};
use recall_core::registry::ModelRegistry;
use recall_core::store::Store;
use recall_core::vectorize::transform;
use recall_core::vocabulary::{corpus_fingerprint, VocabularyModel};

use crate::cancel::CancellationToken;
use crate::progress::{ChannelProgress, IndexProgressReporter};

pub struct IndexingPipeline<S: Store + ?Sized> {
    store: Arc<S>,
    registry: Arc<ModelRegistry>,
    refit_lock: Mutex<()>,
    chunk_params: ChunkParams,
    max_features: usize,
}

/// A spawned indexing run.
pub struct IndexingTask {
    /// Progress updates; closes after the terminal update.
    pub progress: mpsc::UnboundedReceiver<IndexingProgress>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<usize>>,
}

impl IndexingTask {
    /// Ask the run to stop before its next chunk.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run and return its chunk count.
    pub async fn join(self) -> Result<usize> {
        self.handle
            .await
            .map_err(|e| RecallError::Storage(anyhow!("indexing task panicked: {}", e)))?
    }
}

/// Outcome of a multi-document indexing run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub indexed: usize,
    /// Already indexed, left alone.
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome of [`IndexingPipeline::refresh_stale`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    pub model_version: u64,
    pub refreshed: usize,
    pub up_to_date: usize,
}

impl<S: Store + ?Sized> IndexingPipeline<S> {
    pub fn new(
        store: Arc<S>,
        registry: Arc<ModelRegistry>,
        chunk_params: ChunkParams,
        max_features: usize,
    ) -> Self {
        Self {
            store,
            registry,
            refit_lock: Mutex::new(()),
            chunk_params,
            max_features,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn vocabulary_size(&self) -> usize {
        self.registry.vocabulary_size()
    }

    /// Return a model fit on the current corpus, refitting only when the
    /// corpus changed since the current model was fit.
    pub async fn ensure_model(&self) -> Result<Arc<VocabularyModel>> {
        let _guard = self.refit_lock.lock().await;

        let corpus = self.store.list_all_document_texts().await?;
        let fingerprint = corpus_fingerprint(&corpus);
        let current = self.registry.snapshot();

        if current.version() > 0 && current.corpus_fingerprint() == fingerprint {
            debug!(
                "corpus unchanged; keeping vocabulary v{}",
                current.version()
            );
            return Ok(current);
        }

        info!(
            "refitting vocabulary on {} documents (was v{})",
            corpus.len(),
            current.version()
        );
        let texts: Vec<&str> = corpus.iter().map(|e| e.text.as_str()).collect();
        let model = self
            .registry
            .prepare(VocabularyModel::fit(&texts, self.max_features).with_fingerprint(fingerprint));
        // Chunks may only be tagged with a version that exists on disk.
        self.store.save_model(&model).await?;
        self.registry.publish_prepared(model)
    }

    /// Index one document, reporting progress to `reporter`.
    ///
    /// Returns the number of chunks written.
    pub async fn index_document(
        &self,
        document_id: &str,
        reporter: &dyn IndexProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let doc = match self.store.get_document(document_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return Err(RecallError::DocumentNotFound(document_id.to_string())),
            Err(e) => {
                let e = RecallError::from(e);
                warn!("loading {} failed: {}", document_id, e);
                reporter.report(&IndexingProgress {
                    document_id: document_id.to_string(),
                    file_name: String::new(),
                    processed_chunks: 0,
                    total_chunks: 0,
                    state: ProgressState::Failed {
                        reason: e.to_string(),
                    },
                });
                return Err(e);
            }
        };

        let pieces = chunk_text(&doc.content, &self.chunk_params);
        let total = pieces.len();
        let mut written: Vec<String> = Vec::with_capacity(total);

        match self
            .run(&doc, &pieces, reporter, cancel, &mut written)
            .await
        {
            Ok(count) => {
                info!("indexed {} ({} chunks)", doc.file_name, count);
                reporter.report(&progress(
                    &doc,
                    count,
                    total,
                    ProgressState::Completed { chunk_count: count },
                ));
                Ok(count)
            }
            Err(e) => {
                if !written.is_empty() {
                    if let Err(cleanup) = self.store.delete_chunks(&written).await {
                        warn!(
                            "could not remove {} partial chunks of {}: {}",
                            written.len(),
                            doc.id,
                            cleanup
                        );
                    }
                }
                let state = match &e {
                    RecallError::Cancelled => {
                        info!("indexing {} cancelled", doc.file_name);
                        ProgressState::Cancelled
                    }
                    other => {
                        warn!("indexing {} failed: {}", doc.file_name, other);
                        ProgressState::Failed {
                            reason: other.to_string(),
                        }
                    }
                };
                reporter.report(&progress(&doc, written.len(), total, state));
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        doc: &Document,
        pieces: &[TextChunk],
        reporter: &dyn IndexProgressReporter,
        cancel: &CancellationToken,
        written: &mut Vec<String>,
    ) -> Result<usize> {
        let previous = self.store.chunk_ids_for_document(&doc.id).await?;
        let model = self.ensure_model().await?;
        let total = pieces.len();

        for piece in pieces {
            if cancel.is_cancelled() {
                return Err(RecallError::Cancelled);
            }

            let vector = transform(&piece.text, &model);
            let chunk = DocumentChunk::new(
                &doc.id,
                piece.ordinal as i64,
                &piece.text,
                vector,
                model.version(),
            );
            self.store.save_chunk(&chunk).await?;
            written.push(chunk.id);

            reporter.report(&progress(doc, written.len(), total, ProgressState::Running));
            tokio::task::yield_now().await;
        }

        if !previous.is_empty() {
            self.store.delete_chunks(&previous).await?;
        }
        self.store
            .mark_indexed(&doc.id, now_millis(), written.len() as i64)
            .await?;

        Ok(written.len())
    }

    /// Index every document, or only those not yet indexed.
    ///
    /// A failing document is counted and skipped; cancellation stops the
    /// batch.
    pub async fn index_many(
        &self,
        only_pending: bool,
        reporter: &dyn IndexProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<BatchSummary> {
        let docs = self.store.list_documents().await?;
        let mut summary = BatchSummary::default();

        // Oldest first, so progress follows upload order.
        for doc in docs.iter().rev() {
            if only_pending && doc.indexed {
                summary.skipped += 1;
                continue;
            }
            match self.index_document(&doc.id, reporter, cancel).await {
                Ok(_) => summary.indexed += 1,
                Err(RecallError::Cancelled) => return Err(RecallError::Cancelled),
                Err(_) => summary.failed += 1,
            }
        }

        Ok(summary)
    }

    /// Re-vectorize every chunk whose stored vector was not produced by
    /// the current model, or cannot be decoded.
    pub async fn refresh_stale(&self, cancel: &CancellationToken) -> Result<RefreshSummary> {
        let model = self.ensure_model().await?;
        let mut summary = RefreshSummary {
            model_version: model.version(),
            ..RefreshSummary::default()
        };
        if !model.is_fit() {
            return Ok(summary);
        }

        for row in self.store.list_chunks().await? {
            if cancel.is_cancelled() {
                return Err(RecallError::Cancelled);
            }
            let current = row.model_version == model.version()
                && decode_vector(&row.embedding).is_ok_and(|v| v.len() == model.len());
            if current {
                summary.up_to_date += 1;
                continue;
            }
            let vector = transform(&row.text, &model);
            self.store
                .update_chunk_embedding(&row.chunk_id, &vector, model.version())
                .await?;
            summary.refreshed += 1;
        }

        info!(
            "refreshed {} chunks under vocabulary v{} ({} already current)",
            summary.refreshed, summary.model_version, summary.up_to_date
        );
        Ok(summary)
    }
}

impl<S: Store + ?Sized + 'static> IndexingPipeline<S> {
    /// Run [`index_document`](Self::index_document) on the tokio runtime,
    /// streaming progress through the returned task.
    pub fn spawn(self: &Arc<Self>, document_id: &str) -> IndexingTask {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let pipeline = Arc::clone(self);
        let token = cancel.clone();
        let id = document_id.to_string();
        let handle = tokio::spawn(async move {
            let reporter = ChannelProgress::new(tx);
            pipeline.index_document(&id, &reporter, &token).await
        });

        IndexingTask {
            progress: rx,
            cancel,
            handle,
        }
    }
}

fn progress(
    doc: &Document,
    processed: usize,
    total: usize,
    state: ProgressState,
) -> IndexingProgress {
    IndexingProgress {
        document_id: doc.id.clone(),
        file_name: doc.file_name.clone(),
        processed_chunks: processed,
        total_chunks: total,
        state,
    }
}
