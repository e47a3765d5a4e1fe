//! In-memory vector index with deterministic similarity ranking.
//!
//! A [`VectorIndex`] belongs to exactly one model version: every vector
//! added must have the model's dimensionality. Scores are
//! [`cosine_similarity`], which for the unit vectors the vectorizer
//! produces equals their dot product.
//!
//! # Ranking
//!
//! Results are sorted by score (desc), then `indexed_at` (desc, newer
//! chunks win), then `chunk_index` (asc), then `chunk_id` (asc), and
//! truncated to `top_k`. Entries with an all-zero vector are
//! unrepresentable and never returned.
//!
//! `indexed_at` is the chunk's creation time. Reindexing a document
//! rewrites all of its chunks, so this is also the time the document was
//! last indexed.

use std::cmp::Ordering;

use crate::embedding::{cosine_similarity, is_zero};
use crate::error::{RecallError, Result};

/// Identity of an indexed chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRef {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: i64,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: ChunkRef,
    indexed_at: i64,
    vector: Vec<f32>,
}

/// A ranked match from [`VectorIndex::search`].
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: ChunkRef,
    pub indexed_at: i64,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct VectorIndex {
    dims: usize,
    model_version: u64,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn new(dims: usize, model_version: u64) -> Self {
        Self {
            dims,
            model_version,
            entries: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn model_version(&self) -> u64 {
        self.model_version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a chunk vector. Rejects vectors of the wrong dimensionality.
    pub fn add(&mut self, chunk: ChunkRef, indexed_at: i64, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dims {
            return Err(RecallError::DimensionMismatch {
                expected: self.dims,
                actual: vector.len(),
            });
        }
        self.entries.push(IndexEntry {
            chunk,
            indexed_at,
            vector,
        });
        Ok(())
    }

    /// Remove every chunk of `document_id`, returning how many were removed.
    pub fn remove(&mut self, document_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.chunk.document_id != document_id);
        before - self.entries.len()
    }

    /// Rank entries by similarity to `query`.
    ///
    /// Returns at most `min(top_k, len)` results, never padded. A zero query
    /// vector matches nothing.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Err(RecallError::InvalidTopK);
        }
        if query.len() != self.dims {
            return Err(RecallError::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }
        if is_zero(query) {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .filter(|e| !is_zero(&e.vector))
            .map(|e| ScoredChunk {
                chunk: e.chunk.clone(),
                indexed_at: e.indexed_at,
                score: cosine_similarity(query, &e.vector),
            })
            .collect();

        scored.sort_by(compare_ranked);
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn compare_ranked(a: &ScoredChunk, b: &ScoredChunk) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then(b.indexed_at.cmp(&a.indexed_at))
        .then(a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
        .then_with(|| a.chunk.chunk_id.cmp(&b.chunk.chunk_id))
}
