//! Core data models used throughout Recall.
//!
//! These types represent the documents, chunks, progress updates, and
//! search hits that flow through the indexing and retrieval pipeline.
//! Timestamps are unix milliseconds.

use serde::Serialize;
use uuid::Uuid;

/// An ingested document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub file_name: String,
    pub content: String,
    pub content_type: String,
    pub file_size: i64,
    pub uploaded_at: i64,
    pub indexed: bool,
    pub indexed_at: Option<i64>,
    pub chunk_count: i64,
}

impl Document {
    /// Create a new, not-yet-indexed document with a fresh UUID.
    pub fn new(file_name: &str, content: &str, content_type: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            content: content.to_string(),
            content_type: content_type.to_string(),
            file_size: content.len() as i64,
            uploaded_at: now_millis(),
            indexed: false,
            indexed_at: None,
            chunk_count: 0,
        }
    }
}

/// A chunk of a document together with its embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    /// Version of the vocabulary model that produced `embedding`.
    pub model_version: u64,
    pub created_at: i64,
}

impl DocumentChunk {
    pub fn new(
        document_id: &str,
        chunk_index: i64,
        text: &str,
        embedding: Vec<f32>,
        model_version: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            chunk_index,
            text: text.to_string(),
            embedding,
            model_version,
            created_at: now_millis(),
        }
    }
}

/// One stored text of the corpus the vocabulary is fit on.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub document_id: String,
    pub text: String,
}

/// A chunk row as read back from storage, vector still encoded.
///
/// The search engine decides per row whether the stored vector is usable
/// (same model version, well-formed) or must be recomputed.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub file_name: String,
    pub chunk_index: i64,
    pub text: String,
    pub embedding: String,
    pub model_version: u64,
    pub created_at: i64,
}

/// Lifecycle state carried by an [`IndexingProgress`] update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProgressState {
    Running,
    Completed { chunk_count: usize },
    Failed { reason: String },
    Cancelled,
}

impl ProgressState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressState::Running)
    }
}

/// A single progress update for one document's indexing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexingProgress {
    pub document_id: String,
    pub file_name: String,
    pub processed_chunks: usize,
    pub total_chunks: usize,
    #[serde(flatten)]
    pub state: ProgressState,
}

/// A ranked search result handed to the context-assembly consumer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// 1-based position in the result list.
    pub rank: usize,
    pub score: f32,
    pub document_id: String,
    pub file_name: String,
    pub chunk_id: String,
    pub chunk_index: i64,
    pub text: String,
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
