//! Indexing commands: `recall index` and `recall refresh`.
//!
//! Progress goes to stderr through the selected [`ProgressMode`]; the final
//! summary goes to stdout. Ctrl-C cancels the run at the next chunk
//! boundary and leaves the database as it was before the interrupted
//! document.

use anyhow::{bail, Result};
use tracing::warn;

use recall_core::error::RecallError;

use crate::cancel::CancellationToken;
use crate::documents::parse_document_id;
use crate::engine::Engine;
use crate::progress::ProgressMode;

/// Which documents `recall index` should process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexTarget {
    One(String),
    All,
    Pending,
}

impl IndexTarget {
    pub fn from_args(id: Option<String>, all: bool, pending: bool) -> Result<Self> {
        match (id, all, pending) {
            (Some(id), false, false) => Ok(IndexTarget::One(id)),
            (None, true, false) => Ok(IndexTarget::All),
            (None, false, true) => Ok(IndexTarget::Pending),
            _ => bail!("specify exactly one of: a document id, --all, --pending"),
        }
    }
}

pub async fn run_index(engine: &Engine, target: IndexTarget, mode: ProgressMode) -> Result<()> {
    match target {
        IndexTarget::One(id) => index_one(engine, &id, mode).await,
        IndexTarget::All => index_many(engine, false, mode).await,
        IndexTarget::Pending => index_many(engine, true, mode).await,
    }
}

async fn index_one(engine: &Engine, id: &str, mode: ProgressMode) -> Result<()> {
    let id = parse_document_id(id)?;
    let reporter = mode.reporter();
    let mut task = engine.index_document(&id);

    loop {
        tokio::select! {
            update = task.progress.recv() => match update {
                Some(update) => reporter.report(&update),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupt received; cancelling");
                task.cancel();
            }
        }
    }

    match task.join().await {
        Ok(count) => {
            println!("indexed {}: {} chunks", id, count);
            println!(
                "vocabulary: v{} ({} terms)",
                engine.registry().version(),
                engine.vocabulary_size()
            );
            Ok(())
        }
        Err(RecallError::Cancelled) => {
            println!("cancelled; {} left unchanged", id);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn index_many(engine: &Engine, only_pending: bool, mode: ProgressMode) -> Result<()> {
    let reporter = mode.reporter();
    let cancel = CancellationToken::new();

    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received; cancelling");
                cancel.cancel();
            }
        })
    };

    let result = engine
        .pipeline()
        .index_many(only_pending, reporter.as_ref(), &cancel)
        .await;
    watcher.abort();

    match result {
        Ok(summary) => {
            println!("indexed documents: {}", summary.indexed);
            println!("skipped documents: {}", summary.skipped);
            println!("failed documents: {}", summary.failed);
            println!(
                "vocabulary: v{} ({} terms)",
                engine.registry().version(),
                engine.vocabulary_size()
            );
            if summary.failed > 0 {
                bail!("{} documents failed to index", summary.failed);
            }
            Ok(())
        }
        Err(RecallError::Cancelled) => {
            println!("cancelled");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn run_refresh(engine: &Engine) -> Result<()> {
    let summary = engine
        .pipeline()
        .refresh_stale(&CancellationToken::new())
        .await?;
    println!("vocabulary: v{}", summary.model_version);
    println!("refreshed chunks: {}", summary.refreshed);
    println!("up-to-date chunks: {}", summary.up_to_date);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_target_from_args() {
        assert_eq!(
            IndexTarget::from_args(Some("x".into()), false, false).unwrap(),
            IndexTarget::One("x".into())
        );
        assert_eq!(
            IndexTarget::from_args(None, true, false).unwrap(),
            IndexTarget::All
        );
        assert_eq!(
            IndexTarget::from_args(None, false, true).unwrap(),
            IndexTarget::Pending
        );
        assert!(IndexTarget::from_args(None, false, false).is_err());
        assert!(IndexTarget::from_args(Some("x".into()), true, false).is_err());
        assert!(IndexTarget::from_args(None, true, true).is_err());
    }
}
