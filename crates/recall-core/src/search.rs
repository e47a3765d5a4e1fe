//! Similarity search over stored chunk vectors.
//!
//! The search algorithm operates entirely through the [`Store`] trait and a
//! [`ModelRegistry`]. The calling application owns both and passes the
//! retrieval parameters in [`SearchParams`].
//!
//! # Algorithm
//!
//! 1. Snapshot the current model. An unfit model means no results.
//! 2. Vectorize the query with the snapshot. A zero query means no results.
//! 3. Load every stored chunk and build a [`VectorIndex`] for the snapshot:
//!    - same model version: decode the stored vector (malformed ⇒ zero,
//!      i.e. not a candidate);
//!    - other version (stale): recompute from the chunk text, or skip,
//!      per [`StalePolicy`].
//! 4. Rank with [`VectorIndex::search`].
//! 5. If the registry version moved while searching, retry with a fresh
//!    snapshot up to `max_retries` times, then fail with
//!    [`RecallError::ModelChanged`].

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embedding::parse_vector_or_default;
use crate::error::{RecallError, Result};
use crate::index::{ChunkRef, VectorIndex};
use crate::models::{SearchHit, StoredChunk};
use crate::registry::ModelRegistry;
use crate::store::Store;
use crate::vectorize::transform;
use crate::vocabulary::VocabularyModel;

/// What to do with a stored vector produced by an older model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Recompute the vector from the chunk text under the current model.
    #[default]
    Revectorize,
    /// Leave the chunk out of the results until it is refreshed.
    Skip,
}

impl StalePolicy {
    /// Parse a policy name, falling back to the default on unknown input.
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            warn!("unknown stale policy {:?}; using revectorize", s);
            StalePolicy::default()
        })
    }
}

impl FromStr for StalePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "revectorize" => Ok(StalePolicy::Revectorize),
            "skip" => Ok(StalePolicy::Skip),
            other => Err(format!(
                "unknown stale policy '{}'. Use revectorize or skip.",
                other
            )),
        }
    }
}

/// Retrieval parameters, decoupled from application config.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Maximum results to return (>= 1).
    pub top_k: usize,
    pub stale_policy: StalePolicy,
    /// Extra attempts when the model is replaced mid-search.
    pub max_retries: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 5,
            stale_policy: StalePolicy::Revectorize,
            max_retries: 3,
        }
    }
}

/// Run a similarity search for `query`.
///
/// Storage failures are returned as [`RecallError::Storage`]. An unfit
/// model or a query with no vocabulary terms yields an empty result.
pub async fn search<S: Store + ?Sized>(
    store: &S,
    registry: &ModelRegistry,
    query: &str,
    params: &SearchParams,
) -> Result<Vec<SearchHit>> {
    if params.top_k == 0 {
        return Err(RecallError::InvalidTopK);
    }
    if query.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut attempt = 0;
    loop {
        let snapshot = registry.snapshot();
        let hits = search_with_model(store, &snapshot, query, params).await?;

        let current = registry.version();
        if current == snapshot.version() {
            return Ok(hits);
        }
        if attempt >= params.max_retries {
            return Err(RecallError::ModelChanged {
                expected: snapshot.version(),
                actual: current,
            });
        }
        debug!(
            "model moved from v{} to v{} during search; retrying",
            snapshot.version(),
            current
        );
        attempt += 1;
    }
}

/// Search against one fixed model snapshot.
pub async fn search_with_model<S: Store + ?Sized>(
    store: &S,
    model: &VocabularyModel,
    query: &str,
    params: &SearchParams,
) -> Result<Vec<SearchHit>> {
    if !model.is_fit() {
        debug!("{}; returning no results", RecallError::ModelNotFit);
        return Ok(Vec::new());
    }

    let query_vec = transform(query, model);
    let rows = store.list_chunks().await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let index = build_index(&rows, model, params.stale_policy)?;
    let ranked = index.search(&query_vec, params.top_k)?;

    let by_id: HashMap<&str, &StoredChunk> =
        rows.iter().map(|r| (r.chunk_id.as_str(), r)).collect();

    let hits: Vec<SearchHit> = ranked
        .into_iter()
        .filter_map(|scored| {
            by_id.get(scored.chunk.chunk_id.as_str()).map(|row| (scored.score, *row))
        })
        .enumerate()
        .map(|(i, (score, row))| SearchHit {
            rank: i + 1,
            score,
            document_id: row.document_id.clone(),
            file_name: row.file_name.clone(),
            chunk_id: row.chunk_id.clone(),
            chunk_index: row.chunk_index,
            text: row.text.clone(),
        })
        .collect();

    debug!(
        "search {:?} under model v{}: {} results from {} chunks",
        query,
        model.version(),
        hits.len(),
        rows.len()
    );
    Ok(hits)
}

/// Build an index of `rows` that is consistent with `model`.
pub fn build_index(
    rows: &[StoredChunk],
    model: &VocabularyModel,
    stale_policy: StalePolicy,
) -> Result<VectorIndex> {
    let mut index = VectorIndex::new(model.len(), model.version());
    let mut stale = 0usize;
    let mut malformed = 0usize;

    for row in rows {
        let vector = if row.model_version == model.version() {
            let v = parse_vector_or_default(&row.embedding);
            if v.len() == model.len() {
                v
            } else {
                warn!(
                    "chunk {} has {} dims under model v{} (expected {}); excluded",
                    row.chunk_id,
                    v.len(),
                    model.version(),
                    model.len()
                );
                malformed += 1;
                vec![0.0; model.len()]
            }
        } else {
            stale += 1;
            match stale_policy {
                StalePolicy::Revectorize => transform(&row.text, model),
                StalePolicy::Skip => continue,
            }
        };

        index.add(
            ChunkRef {
                chunk_id: row.chunk_id.clone(),
                document_id: row.document_id.clone(),
                chunk_index: row.chunk_index,
            },
            row.created_at,
            vector,
        )?;
    }

    if stale > 0 || malformed > 0 {
        debug!(
            "index for model v{}: {} stale ({:?}), {} malformed of {} chunks",
            model.version(),
            stale,
            stale_policy,
            malformed,
            rows.len()
        );
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::encode_vector;
    use crate::models::{Document, DocumentChunk};
    use crate::store::memory::InMemoryStore;
    use crate::vocabulary::MAX_FEATURES;

    /// Insert documents as single chunks vectorized under `model`.
    async fn seed(
        store: &InMemoryStore,
        model: &VocabularyModel,
        texts: &[&str],
    ) -> Vec<Document> {
        let mut docs = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            let mut doc = Document::new(&format!("doc{}.txt", i), text, "text/plain");
            doc.uploaded_at = i as i64;
            store.insert_document(&doc).await.unwrap();
            let mut chunk =
                DocumentChunk::new(&doc.id, 0, text, transform(text, model), model.version());
            chunk.created_at = 1000 + i as i64;
            store.save_chunk(&chunk).await.unwrap();
            docs.push(doc);
        }
        docs
    }

    fn params(top_k: usize) -> SearchParams {
        SearchParams {
            top_k,
            ..SearchParams::default()
        }
    }

    #[tokio::test]
    async fn test_scenario_cat_query() {
        let store = InMemoryStore::new();
        let registry = ModelRegistry::new();
        let corpus = ["the cat sat on the mat", "the dog ran in the park"];
        let model = registry.publish(VocabularyModel::fit(&corpus, MAX_FEATURES));
        let docs = seed(&store, &model, &corpus).await;

        let hits = search(&store, &registry, "cat", &params(10)).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].document_id, docs[0].id);
        assert!(hits[0].score > 0.0);
        assert_eq!(hits[1].document_id, docs[1].id);
        assert_eq!(hits[1].score, 0.0);
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[1].rank, 2);
    }

    #[tokio::test]
    async fn test_results_bounded_sorted_in_range() {
        let store = InMemoryStore::new();
        let registry = ModelRegistry::new();
        let corpus = [
            "rust ownership borrowing lifetimes",
            "rust cargo crates registry",
            "python pip packages",
            "ownership rules rust compiler",
        ];
        let model = registry.publish(VocabularyModel::fit(&corpus, MAX_FEATURES));
        seed(&store, &model, &corpus).await;

        for k in 1..=5 {
            let hits = search(&store, &registry, "rust ownership", &params(k))
                .await
                .unwrap();
            assert!(hits.len() <= k);
            assert!(hits.len() <= corpus.len());
            for pair in hits.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
            for h in &hits {
                assert!((-1.0..=1.0).contains(&h.score));
            }
        }
    }

    #[tokio::test]
    async fn test_ties_prefer_recent_chunks() {
        let store = InMemoryStore::new();
        let registry = ModelRegistry::new();
        let corpus = ["same words here", "same words here"];
        let model = registry.publish(VocabularyModel::fit(&corpus, MAX_FEATURES));
        let docs = seed(&store, &model, &corpus).await;

        let hits = search(&store, &registry, "same words", &params(2))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, hits[1].score);
        assert_eq!(hits[0].document_id, docs[1].id, "newer chunk must win the tie");
    }

    #[tokio::test]
    async fn test_unfit_model_returns_nothing() {
        let store = InMemoryStore::new();
        let registry = ModelRegistry::new();
        let unfit = VocabularyModel::empty();
        seed(&store, &unfit, &["the cat sat on the mat"]).await;

        let hits = search(&store, &registry, "cat", &params(3)).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_zero_vectors_never_match() {
        let store = InMemoryStore::new();
        let registry = ModelRegistry::new();
        // The second document is all stop words, so its vector is zero.
        let corpus = ["cat on a mat", "the of and"];
        let model = registry.publish(VocabularyModel::fit(&corpus, MAX_FEATURES));
        seed(&store, &model, &corpus).await;

        let hits = search(&store, &registry, "cat", &params(5)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "cat on a mat");
    }

    #[tokio::test]
    async fn test_stale_vectors_revectorized() {
        let store = InMemoryStore::new();
        let registry = ModelRegistry::new();
        let old = registry.publish(VocabularyModel::fit(&["alpha beta"], MAX_FEATURES));
        seed(&store, &old, &["alpha beta", "gamma delta"]).await;
        registry.publish(VocabularyModel::fit(
            &["alpha beta", "gamma delta"],
            MAX_FEATURES,
        ));

        let hits = search(&store, &registry, "gamma", &params(5)).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].text, "gamma delta");
        assert!(hits[0].score > 0.0);

        let skipped = search(
            &store,
            &registry,
            "gamma",
            &SearchParams {
                stale_policy: StalePolicy::Skip,
                ..params(5)
            },
        )
        .await
        .unwrap();
        assert!(skipped.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_vector_is_not_a_candidate() {
        let store = InMemoryStore::new();
        let registry = ModelRegistry::new();
        let corpus = ["cat sat mat", "cat dog"];
        let model = registry.publish(VocabularyModel::fit(&corpus, MAX_FEATURES));
        seed(&store, &model, &corpus).await;
        let rows = store.list_chunks().await.unwrap();
        let broken = rows.iter().find(|r| r.text == "cat dog").unwrap();
        store
            .set_raw_embedding(&broken.chunk_id, "{not a vector")
            .unwrap();

        let hits = search(&store, &registry, "cat", &params(5)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].text, "cat sat mat");
    }

    #[test]
    fn test_build_index_excludes_unusable_vectors() {
        let model = ModelRegistry::new().publish(VocabularyModel::fit(
            &["cat sat mat", "cat dog", "cat ran"],
            MAX_FEATURES,
        ));
        let row = |id: &str, text: &str, embedding: String| StoredChunk {
            chunk_id: id.to_string(),
            document_id: format!("doc-{}", id),
            file_name: format!("{}.txt", id),
            chunk_index: 0,
            text: text.to_string(),
            embedding,
            model_version: model.version(),
            created_at: 0,
        };
        let rows = vec![
            row("good", "cat sat mat", encode_vector(&transform("cat sat mat", &model))),
            row("short", "cat dog", "[0.5,0.5]".to_string()),
            row("garbage", "cat ran", "not json".to_string()),
        ];

        let index = build_index(&rows, &model, StalePolicy::Revectorize).unwrap();
        let hits = index.search(&transform("cat", &model), 5).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["good"]);
    }

    #[tokio::test]
    async fn test_invalid_top_k() {
        let store = InMemoryStore::new();
        let registry = ModelRegistry::new();
        let err = search(&store, &registry, "cat", &params(0)).await.unwrap_err();
        assert!(matches!(err, RecallError::InvalidTopK));
    }

    #[tokio::test]
    async fn test_blank_query() {
        let store = InMemoryStore::new();
        let registry = ModelRegistry::new();
        registry.publish(VocabularyModel::fit(&["alpha"], MAX_FEATURES));
        assert!(search(&store, &registry, "   ", &params(3))
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_stale_policy_parse() {
        assert_eq!("skip".parse::<StalePolicy>(), Ok(StalePolicy::Skip));
        assert_eq!(
            StalePolicy::parse_or_default("revectorize"),
            StalePolicy::Revectorize
        );
        assert_eq!(
            StalePolicy::parse_or_default("bogus"),
            StalePolicy::Revectorize
        );
        assert!("bogus".parse::<StalePolicy>().is_err());
    }
}
