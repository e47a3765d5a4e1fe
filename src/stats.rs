//! Database statistics and health overview.
//!
//! Summarizes what is stored and how much of it is searchable under the
//! current vocabulary: document counts (total / indexed), chunk counts,
//! and chunks whose vectors were computed by an older model.

use anyhow::Result;
use serde::Serialize;

use crate::engine::Engine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub documents: i64,
    pub indexed_documents: i64,
    pub chunks: i64,
    pub stale_chunks: i64,
    pub model_version: u64,
    pub vocabulary_size: usize,
}

pub async fn collect_stats(engine: &Engine) -> Result<Stats> {
    let pool = engine.store().pool();
    let model_version = engine.registry().version();

    let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;
    let indexed_documents: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE indexed = 1")
            .fetch_one(pool)
            .await?;
    let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(pool)
        .await?;
    let stale_chunks: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE model_version != ?")
            .bind(model_version as i64)
            .fetch_one(pool)
            .await?;

    Ok(Stats {
        documents,
        indexed_documents,
        chunks,
        stale_chunks,
        model_version,
        vocabulary_size: engine.vocabulary_size(),
    })
}

pub async fn run_stats(engine: &Engine, json: bool) -> Result<()> {
    let stats = collect_stats(engine).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let db_path = &engine.config().db.path;
    let db_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    println!("Recall — Database Stats");
    println!("=======================");
    println!();
    println!("  Database:    {}", db_path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!(
        "  Documents:   {} ({} indexed)",
        stats.documents, stats.indexed_documents
    );
    println!("  Chunks:      {}", stats.chunks);
    println!(
        "  Current:     {} / {} ({}%)",
        stats.chunks - stats.stale_chunks,
        stats.chunks,
        if stats.chunks > 0 {
            ((stats.chunks - stats.stale_chunks) * 100) / stats.chunks
        } else {
            0
        }
    );
    if stats.model_version == 0 {
        println!("  Vocabulary:  not fit");
    } else {
        println!(
            "  Vocabulary:  v{} ({} terms)",
            stats.model_version, stats.vocabulary_size
        );
    }
    if stats.stale_chunks > 0 {
        println!();
        println!(
            "  {} chunks predate the current vocabulary; run `recall refresh`.",
            stats.stale_chunks
        );
    }
    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
