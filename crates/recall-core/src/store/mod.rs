//! Storage abstraction for Recall.
//!
//! The [`Store`] trait is the storage collaborator the indexing pipeline
//! and the search engine consume: documents, chunk vectors, and the
//! persisted vocabulary model. Backends: [`memory::InMemoryStore`] here,
//! SQLite in the `recall` app crate.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CorpusEntry, Document, DocumentChunk, StoredChunk};
use crate::vocabulary::VocabularyModel;

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_document`](Store::insert_document) | Ingest a new document |
/// | [`get_document`](Store::get_document) | Fetch one document |
/// | [`list_documents`](Store::list_documents) | All documents, newest first |
/// | [`delete_document`](Store::delete_document) | Delete a document and its chunks |
/// | [`list_all_document_texts`](Store::list_all_document_texts) | The fitting corpus |
/// | [`save_chunk`](Store::save_chunk) | Persist one chunk with its vector |
/// | [`chunk_ids_for_document`](Store::chunk_ids_for_document) | Chunk ids of a document |
/// | [`delete_chunks`](Store::delete_chunks) | Delete chunks by id |
/// | [`mark_indexed`](Store::mark_indexed) | Flag a document as indexed |
/// | [`list_chunks`](Store::list_chunks) | Every chunk, vector still encoded |
/// | [`update_chunk_embedding`](Store::update_chunk_embedding) | Re-vectorize one chunk |
/// | [`save_model`](Store::save_model) / [`load_model`](Store::load_model) | Persist the vocabulary |
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_document(&self, doc: &Document) -> Result<()>;

    /// One document, content included.
    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    /// All documents ordered by `uploaded_at` descending.
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Delete a document and, in cascade, its chunks. Returns false if the
    /// document did not exist.
    async fn delete_document(&self, id: &str) -> Result<bool>;

    /// Every stored document's content, ordered by `uploaded_at` then id.
    async fn list_all_document_texts(&self) -> Result<Vec<CorpusEntry>>;

    async fn save_chunk(&self, chunk: &DocumentChunk) -> Result<()>;

    async fn chunk_ids_for_document(&self, document_id: &str) -> Result<Vec<String>>;

    async fn delete_chunks(&self, chunk_ids: &[String]) -> Result<()>;

    async fn mark_indexed(&self, document_id: &str, indexed_at: i64, chunk_count: i64)
        -> Result<()>;

    /// Every chunk joined with its document's file name, ordered by
    /// document then chunk index.
    async fn list_chunks(&self) -> Result<Vec<StoredChunk>>;

    async fn update_chunk_embedding(
        &self,
        chunk_id: &str,
        embedding: &[f32],
        model_version: u64,
    ) -> Result<()>;

    /// Persist `model` as the current vocabulary, replacing any older one.
    async fn save_model(&self, model: &VocabularyModel) -> Result<()>;

    async fn load_model(&self) -> Result<Option<VocabularyModel>>;
}
