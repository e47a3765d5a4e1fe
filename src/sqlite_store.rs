//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the schema created by
//! [`migrate::run_migrations`](crate::migrate::run_migrations): documents,
//! chunks (JSON vectors tagged with their model version), and the
//! persisted vocabulary.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use recall_core::embedding::encode_vector;
use recall_core::models::{CorpusEntry, Document, DocumentChunk, StoredChunk};
use recall_core::store::Store;
use recall_core::vocabulary::VocabularyModel;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn document_from_row(row: &SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        file_name: row.get("file_name"),
        content: row.get("content"),
        content_type: row.get("content_type"),
        file_size: row.get("file_size"),
        uploaded_at: row.get("uploaded_at"),
        indexed: row.get("indexed"),
        indexed_at: row.get("indexed_at"),
        chunk_count: row.get("chunk_count"),
    }
}

const DOCUMENT_COLUMNS: &str = "id, file_name, content, content_type, file_size, uploaded_at, \
                                indexed, indexed_at, chunk_count";

#[async_trait]
impl Store for SqliteStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, file_name, content, content_type, file_size,
                                   uploaded_at, indexed, indexed_at, chunk_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.file_name)
        .bind(&doc.content)
        .bind(&doc.content_type)
        .bind(doc.file_size)
        .bind(doc.uploaded_at)
        .bind(doc.indexed)
        .bind(doc.indexed_at)
        .bind(doc.chunk_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents ORDER BY uploaded_at DESC, id ASC",
            DOCUMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_all_document_texts(&self) -> Result<Vec<CorpusEntry>> {
        let rows = sqlx::query("SELECT id, content FROM documents ORDER BY uploaded_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| CorpusEntry {
                document_id: row.get("id"),
                text: row.get("content"),
            })
            .collect())
    }

    async fn save_chunk(&self, chunk: &DocumentChunk) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chunks (id, document_id, chunk_index, text, embedding,
                                model_version, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                text = excluded.text,
                embedding = excluded.embedding,
                model_version = excluded.model_version
            "#,
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(encode_vector(&chunk.embedding))
        .bind(chunk.model_version as i64)
        .bind(chunk.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn chunk_ids_for_document(&self, document_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM chunks WHERE document_id = ? ORDER BY chunk_index ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn delete_chunks(&self, chunk_ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in chunk_ids {
            sqlx::query("DELETE FROM chunks WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn mark_indexed(
        &self,
        document_id: &str,
        indexed_at: i64,
        chunk_count: i64,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE documents SET indexed = 1, indexed_at = ?, chunk_count = ? WHERE id = ?",
        )
        .bind(indexed_at)
        .bind(chunk_count)
        .bind(document_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("document {} does not exist", document_id);
        }
        Ok(())
    }

    async fn list_chunks(&self) -> Result<Vec<StoredChunk>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.document_id, d.file_name, c.chunk_index, c.text,
                   c.embedding, c.model_version, c.created_at
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
            ORDER BY c.document_id ASC, c.chunk_index ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StoredChunk {
                chunk_id: row.get("id"),
                document_id: row.get("document_id"),
                file_name: row.get("file_name"),
                chunk_index: row.get("chunk_index"),
                text: row.get("text"),
                embedding: row.get("embedding"),
                model_version: row.get::<i64, _>("model_version") as u64,
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn update_chunk_embedding(
        &self,
        chunk_id: &str,
        embedding: &[f32],
        model_version: u64,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE chunks SET embedding = ?, model_version = ? WHERE id = ?")
            .bind(encode_vector(embedding))
            .bind(model_version as i64)
            .bind(chunk_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            bail!("chunk {} does not exist", chunk_id);
        }
        Ok(())
    }

    async fn save_model(&self, model: &VocabularyModel) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM vocabulary_terms")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM vocabulary_models")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO vocabulary_models (version, corpus_fingerprint, corpus_size, fitted_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(model.version() as i64)
        .bind(model.corpus_fingerprint())
        .bind(model.corpus_size() as i64)
        .bind(model.fitted_at())
        .execute(&mut *tx)
        .await?;

        for (i, (term, idf)) in model.terms().enumerate() {
            sqlx::query(
                "INSERT INTO vocabulary_terms (model_version, term_index, term, idf) VALUES (?, ?, ?, ?)",
            )
            .bind(model.version() as i64)
            .bind(i as i64)
            .bind(term)
            .bind(idf)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_model(&self) -> Result<Option<VocabularyModel>> {
        let header = sqlx::query(
            "SELECT version, corpus_fingerprint, corpus_size, fitted_at \
             FROM vocabulary_models ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let header = match header {
            Some(row) => row,
            None => return Ok(None),
        };
        let version: i64 = header.get("version");

        let term_rows = sqlx::query(
            "SELECT term, idf FROM vocabulary_terms WHERE model_version = ? ORDER BY term_index ASC",
        )
        .bind(version)
        .fetch_all(&self.pool)
        .await?;

        let terms: Vec<(String, f64)> = term_rows
            .iter()
            .map(|row| (row.get("term"), row.get("idf")))
            .collect();

        Ok(Some(VocabularyModel::from_parts(
            terms,
            version as u64,
            header.get("corpus_fingerprint"),
            header.get::<i64, _>("corpus_size") as usize,
            header.get("fitted_at"),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, DbConfig};
    use recall_core::embedding::decode_vector;
    use recall_core::registry::ModelRegistry;
    use recall_core::vocabulary::MAX_FEATURES;
    use tempfile::TempDir;

    async fn open(tmp: &TempDir) -> SqliteStore {
        let cfg = Config {
            db: DbConfig {
                path: tmp.path().join("recall.sqlite"),
            },
            chunking: Default::default(),
            vocabulary: Default::default(),
            retrieval: Default::default(),
        };
        crate::migrate::run_migrations(&cfg).await.unwrap();
        SqliteStore::new(crate::db::connect(&cfg).await.unwrap())
    }

    #[tokio::test]
    async fn test_document_roundtrip_and_cascade() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;

        let doc = Document::new("notes.md", "alpha beta gamma", "text/markdown");
        store.insert_document(&doc).await.unwrap();
        assert_eq!(store.get_document(&doc.id).await.unwrap(), Some(doc.clone()));

        let chunk = DocumentChunk::new(&doc.id, 0, "alpha beta gamma", vec![0.6, 0.8], 1);
        store.save_chunk(&chunk).await.unwrap();
        store.mark_indexed(&doc.id, 99, 1).await.unwrap();

        let fetched = store.get_document(&doc.id).await.unwrap().unwrap();
        assert!(fetched.indexed);
        assert_eq!(fetched.indexed_at, Some(99));
        assert_eq!(fetched.chunk_count, 1);

        let rows = store.list_chunks().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_name, "notes.md");
        assert_eq!(decode_vector(&rows[0].embedding).unwrap(), vec![0.6, 0.8]);

        assert!(store.delete_document(&doc.id).await.unwrap());
        assert!(store.list_chunks().await.unwrap().is_empty());
        assert!(!store.delete_document(&doc.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_chunk_requires_existing_document() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let chunk = DocumentChunk::new("missing", 0, "x", vec![], 1);
        assert!(store.save_chunk(&chunk).await.is_err());
    }

    #[tokio::test]
    async fn test_model_persists_latest_only() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        assert!(store.load_model().await.unwrap().is_none());

        let registry = ModelRegistry::new();
        let v1 = registry.publish(VocabularyModel::fit(&["alpha beta beta"], MAX_FEATURES));
        store.save_model(&v1).await.unwrap();
        let v2 = registry.publish(
            VocabularyModel::fit(&["gamma delta", "gamma"], MAX_FEATURES)
                .with_fingerprint("fp2".to_string()),
        );
        store.save_model(&v2).await.unwrap();

        let loaded = store.load_model().await.unwrap().unwrap();
        assert_eq!(loaded.version(), 2);
        assert_eq!(loaded.corpus_fingerprint(), "fp2");
        assert_eq!(loaded.corpus_size(), 2);
        assert_eq!(loaded.index_of("gamma"), Some(0));
        assert_eq!(loaded.idf("delta"), v2.idf("delta"));
        assert!(!loaded.contains("alpha"));
    }

    #[tokio::test]
    async fn test_update_chunk_embedding() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp).await;
        let doc = Document::new("a.txt", "alpha", "text/plain");
        store.insert_document(&doc).await.unwrap();
        let chunk = DocumentChunk::new(&doc.id, 0, "alpha", vec![0.0], 1);
        store.save_chunk(&chunk).await.unwrap();

        store
            .update_chunk_embedding(&chunk.id, &[1.0], 4)
            .await
            .unwrap();
        let rows = store.list_chunks().await.unwrap();
        assert_eq!(rows[0].model_version, 4);
        assert_eq!(rows[0].embedding, "[1.0]");

        assert!(store.update_chunk_embedding("nope", &[1.0], 4).await.is_err());
    }
}
