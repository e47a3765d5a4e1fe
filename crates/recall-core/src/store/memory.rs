//! In-memory [`Store`] implementation for tests and embedding in other
//! hosts.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Vectors are kept
//! in their encoded form, exactly as a persistent backend would hold them.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::embedding::encode_vector;
use crate::models::{CorpusEntry, Document, DocumentChunk, StoredChunk};
use crate::vocabulary::VocabularyModel;

use super::Store;

struct StoredRow {
    id: String,
    document_id: String,
    chunk_index: i64,
    text: String,
    embedding: String,
    model_version: u64,
    created_at: i64,
}

/// In-memory store.
pub struct InMemoryStore {
    docs: RwLock<HashMap<String, Document>>,
    chunks: RwLock<Vec<StoredRow>>,
    model: RwLock<Option<VocabularyModel>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            chunks: RwLock::new(Vec::new()),
            model: RwLock::new(None),
        }
    }

    /// Overwrite the encoded vector of a chunk as-is. Lets tests plant
    /// corrupt rows.
    pub fn set_raw_embedding(&self, chunk_id: &str, raw: &str) -> Result<()> {
        let mut chunks = write(&self.chunks)?;
        for row in chunks.iter_mut().filter(|r| r.id == chunk_id) {
            row.embedding = raw.to_string();
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        write(&self.docs)?.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(read(&self.docs)?.get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = read(&self.docs)?.values().cloned().collect();
        docs.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(docs)
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        write(&self.chunks)?.retain(|r| r.document_id != id);
        Ok(write(&self.docs)?.remove(id).is_some())
    }

    async fn list_all_document_texts(&self) -> Result<Vec<CorpusEntry>> {
        let docs = read(&self.docs)?;
        let mut ordered: Vec<&Document> = docs.values().collect();
        ordered.sort_by(|a, b| {
            a.uploaded_at
                .cmp(&b.uploaded_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(ordered
            .into_iter()
            .map(|d| CorpusEntry {
                document_id: d.id.clone(),
                text: d.content.clone(),
            })
            .collect())
    }

    async fn save_chunk(&self, chunk: &DocumentChunk) -> Result<()> {
        if !read(&self.docs)?.contains_key(&chunk.document_id) {
            return Err(anyhow!("document {} does not exist", chunk.document_id));
        }
        let mut chunks = write(&self.chunks)?;
        chunks.retain(|r| r.id != chunk.id);
        chunks.push(StoredRow {
            id: chunk.id.clone(),
            document_id: chunk.document_id.clone(),
            chunk_index: chunk.chunk_index,
            text: chunk.text.clone(),
            embedding: encode_vector(&chunk.embedding),
            model_version: chunk.model_version,
            created_at: chunk.created_at,
        });
        Ok(())
    }

    async fn chunk_ids_for_document(&self, document_id: &str) -> Result<Vec<String>> {
        Ok(read(&self.chunks)?
            .iter()
            .filter(|r| r.document_id == document_id)
            .map(|r| r.id.clone())
            .collect())
    }

    async fn delete_chunks(&self, chunk_ids: &[String]) -> Result<()> {
        write(&self.chunks)?.retain(|r| !chunk_ids.contains(&r.id));
        Ok(())
    }

    async fn mark_indexed(
        &self,
        document_id: &str,
        indexed_at: i64,
        chunk_count: i64,
    ) -> Result<()> {
        let mut docs = write(&self.docs)?;
        let doc = docs
            .get_mut(document_id)
            .ok_or_else(|| anyhow!("document {} does not exist", document_id))?;
        doc.indexed = true;
        doc.indexed_at = Some(indexed_at);
        doc.chunk_count = chunk_count;
        Ok(())
    }

    async fn list_chunks(&self) -> Result<Vec<StoredChunk>> {
        let docs = read(&self.docs)?;
        let chunks = read(&self.chunks)?;
        let mut out: Vec<StoredChunk> = chunks
            .iter()
            .map(|r| StoredChunk {
                chunk_id: r.id.clone(),
                document_id: r.document_id.clone(),
                file_name: docs
                    .get(&r.document_id)
                    .map(|d| d.file_name.clone())
                    .unwrap_or_default(),
                chunk_index: r.chunk_index,
                text: r.text.clone(),
                embedding: r.embedding.clone(),
                model_version: r.model_version,
                created_at: r.created_at,
            })
            .collect();
        out.sort_by(|a, b| {
            a.document_id
                .cmp(&b.document_id)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        Ok(out)
    }

    async fn update_chunk_embedding(
        &self,
        chunk_id: &str,
        embedding: &[f32],
        model_version: u64,
    ) -> Result<()> {
        let mut chunks = write(&self.chunks)?;
        let row = chunks
            .iter_mut()
            .find(|r| r.id == chunk_id)
            .ok_or_else(|| anyhow!("chunk {} does not exist", chunk_id))?;
        row.embedding = encode_vector(embedding);
        row.model_version = model_version;
        Ok(())
    }

    async fn save_model(&self, model: &VocabularyModel) -> Result<()> {
        *write(&self.model)? = Some(model.clone());
        Ok(())
    }

    async fn load_model(&self) -> Result<Option<VocabularyModel>> {
        Ok(read(&self.model)?.clone())
    }
}
