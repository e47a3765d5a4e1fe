//! Document management commands: `add`, `docs`, `get`, `delete`.
//!
//! Adding a document only stores it; `recall index` chunks and vectorizes
//! it. Every `add` creates a new document, even for a file added before.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use recall_core::models::Document;
use recall_core::store::Store;

use crate::engine::Engine;

/// Document plus its chunks, as printed by `recall get`.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: Document,
    pub model_version: Option<u64>,
    pub chunks: Vec<ChunkResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkResponse {
    pub index: i64,
    pub text: String,
}

pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("md") | Some("markdown") => "text/markdown",
        _ => "text/plain",
    }
}

/// Reject ids that cannot name a document before touching the database.
pub fn parse_document_id(id: &str) -> Result<String> {
    Uuid::parse_str(id)
        .map(|u| u.to_string())
        .with_context(|| format!("invalid document id: {}", id))
}

/// Store the file at `path` as a new document and return it.
pub async fn add_file<S: Store + ?Sized>(
    store: &S,
    path: &Path,
    content_type: Option<&str>,
) -> Result<Document> {
    if !path.is_file() {
        bail!("not a file: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let content_type = content_type.unwrap_or_else(|| content_type_for(path));

    let doc = Document::new(&file_name, &content, content_type);
    store.insert_document(&doc).await?;
    info!("added {} as {} ({} bytes)", file_name, doc.id, doc.file_size);
    Ok(doc)
}

pub async fn run_add(
    engine: &Engine,
    paths: &[PathBuf],
    content_type: Option<&str>,
) -> Result<()> {
    for path in paths {
        let doc = add_file(engine.store(), path, content_type).await?;
        println!("{}  {}", doc.id, path.display());
    }
    println!("added documents: {}", paths.len());
    Ok(())
}

pub async fn run_docs(engine: &Engine) -> Result<()> {
    let docs = engine.store().list_documents().await?;
    if docs.is_empty() {
        println!("No documents. Add some with `recall add <path>`.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<28} {:>9} {:>7}  {}",
        "ID", "FILE", "SIZE", "CHUNKS", "INDEXED"
    );
    for doc in &docs {
        let indexed = match doc.indexed_at {
            Some(ts) if doc.indexed => format_ts(ts),
            _ => "no".to_string(),
        };
        println!(
            "{:<36}  {:<28} {:>9} {:>7}  {}",
            doc.id,
            truncate(&doc.file_name, 28),
            doc.file_size,
            doc.chunk_count,
            indexed
        );
    }

    let indexed = docs.iter().filter(|d| d.indexed).count();
    println!();
    println!("{} documents, {} indexed", docs.len(), indexed);
    Ok(())
}

/// Fetch a document with its chunks in index order.
pub async fn get_document<S: Store + ?Sized>(store: &S, id: &str) -> Result<DocumentResponse> {
    let document = match store.get_document(id).await? {
        Some(doc) => doc,
        None => bail!("document not found: {}", id),
    };

    let mut rows: Vec<_> = store
        .list_chunks()
        .await?
        .into_iter()
        .filter(|c| c.document_id == id)
        .collect();
    rows.sort_by_key(|c| c.chunk_index);

    Ok(DocumentResponse {
        document,
        model_version: rows.first().map(|c| c.model_version),
        chunks: rows
            .into_iter()
            .map(|c| ChunkResponse {
                index: c.chunk_index,
                text: c.text,
            })
            .collect(),
    })
}

pub async fn run_get(engine: &Engine, id: &str, json: bool) -> Result<()> {
    let id = parse_document_id(id)?;
    let resp = get_document(engine.store(), &id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&resp)?);
        return Ok(());
    }
    let doc = &resp.document;

    println!("--- Document ---");
    println!("id:           {}", doc.id);
    println!("file:         {}", doc.file_name);
    println!("content type: {}", doc.content_type);
    println!("size:         {} bytes", doc.file_size);
    println!("uploaded:     {}", format_ts(doc.uploaded_at));
    match doc.indexed_at {
        Some(ts) if doc.indexed => println!("indexed:      {}", format_ts(ts)),
        _ => println!("indexed:      no"),
    }
    if let Some(v) = resp.model_version {
        println!("vocabulary:   v{}", v);
    }
    println!();
    println!("--- Content ---");
    println!("{}", doc.content);
    println!();
    println!("--- Chunks ({}) ---", resp.chunks.len());
    for chunk in &resp.chunks {
        println!("[{}] {}", chunk.index, chunk.text);
    }
    Ok(())
}

pub async fn run_delete(engine: &Engine, id: Option<&str>, all: bool) -> Result<()> {
    let store = engine.store();
    if all {
        let docs = store.list_documents().await?;
        for doc in &docs {
            store.delete_document(&doc.id).await?;
        }
        println!("deleted documents: {}", docs.len());
        return Ok(());
    }

    let id = match id {
        Some(id) => parse_document_id(id)?,
        None => bail!("specify a document id or --all"),
    };
    if !store.delete_document(&id).await? {
        bail!("document not found: {}", id);
    }
    println!("deleted {}", id);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

pub(crate) fn format_ts(ts_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts_millis.to_string())
}
