//! The retrieval engine as a host application sees it.
//!
//! [`Engine`] opens the SQLite store, restores the last persisted
//! vocabulary into a [`ModelRegistry`], and exposes the three operations a
//! consumer needs: [`search`](Engine::search),
//! [`index_document`](Engine::index_document) and
//! [`vocabulary_size`](Engine::vocabulary_size).

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use recall_core::models::SearchHit;
use recall_core::registry::ModelRegistry;
use recall_core::search::search;
use recall_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::pipeline::{IndexingPipeline, IndexingTask};
use crate::sqlite_store::SqliteStore;

pub struct Engine {
    config: Config,
    pipeline: Arc<IndexingPipeline<SqliteStore>>,
}

impl Engine {
    /// Connect to the database and load the persisted vocabulary, if any.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config)
            .await
            .with_context(|| format!("Failed to open database: {}", config.db.path.display()))?;
        let store = Arc::new(SqliteStore::new(pool));

        let registry = match store
            .load_model()
            .await
            .context("Failed to load vocabulary (did you run `recall init`?)")?
        {
            Some(model) => {
                debug!(
                    "loaded vocabulary v{} ({} terms)",
                    model.version(),
                    model.len()
                );
                ModelRegistry::with_model(model)
            }
            None => ModelRegistry::new(),
        };

        let pipeline = IndexingPipeline::new(
            store,
            Arc::new(registry),
            config.chunk_params(),
            config.vocabulary.max_features,
        );

        Ok(Self {
            config: config.clone(),
            pipeline: Arc::new(pipeline),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SqliteStore {
        self.pipeline.store()
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.pipeline.registry()
    }

    pub fn pipeline(&self) -> &Arc<IndexingPipeline<SqliteStore>> {
        &self.pipeline
    }

    /// Rank stored chunks against `query`. `top_k` defaults to
    /// `retrieval.top_k`.
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SearchHit>> {
        let params = self.config.search_params(top_k);
        let hits = search(self.store(), self.registry(), query, &params).await?;
        Ok(hits)
    }

    /// Start indexing `document_id` in the background.
    pub fn index_document(&self, document_id: &str) -> IndexingTask {
        self.pipeline.spawn(document_id)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.pipeline.vocabulary_size()
    }

    pub async fn close(&self) {
        self.store().close().await;
    }
}
