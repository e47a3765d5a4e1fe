//! Configuration loading.
//!
//! Recall reads a single TOML file (default `./config/recall.toml`). Only
//! `[db]` is required; every other section falls back to defaults.
//!
//! ```toml
//! [db]
//! path = "./data/recall.sqlite"
//!
//! [chunking]
//! chunk_size = 500
//! overlap = 50
//!
//! [vocabulary]
//! max_features = 384
//!
//! [retrieval]
//! top_k = 5
//! stale_policy = "revectorize"
//! max_retries = 3
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use recall_core::chunk::{ChunkParams, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use recall_core::search::{SearchParams, StalePolicy};
use recall_core::vocabulary::MAX_FEATURES;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub vocabulary: VocabularyConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct VocabularyConfig {
    #[serde(default = "default_max_features")]
    pub max_features: usize,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            max_features: MAX_FEATURES,
        }
    }
}

fn default_max_features() -> usize {
    MAX_FEATURES
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_stale_policy")]
    pub stale_policy: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            stale_policy: default_stale_policy(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_stale_policy() -> String {
    "revectorize".to_string()
}
fn default_max_retries() -> usize {
    3
}

impl Config {
    pub fn chunk_params(&self) -> ChunkParams {
        ChunkParams {
            chunk_size: self.chunking.chunk_size,
            overlap: self.chunking.overlap,
        }
    }

    /// Search parameters, with `top_k` overridable from the command line.
    pub fn search_params(&self, top_k: Option<usize>) -> SearchParams {
        SearchParams {
            top_k: top_k.unwrap_or(self.retrieval.top_k),
            stale_policy: StalePolicy::parse_or_default(&self.retrieval.stale_policy),
            max_retries: self.retrieval.max_retries,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be < chunking.chunk_size");
    }

    if config.vocabulary.max_features == 0 {
        anyhow::bail!("vocabulary.max_features must be > 0");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    config
        .retrieval
        .stale_policy
        .parse::<StalePolicy>()
        .map_err(|e| anyhow::anyhow!("retrieval.stale_policy: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let cfg = parse("[db]\npath = \"/tmp/recall.sqlite\"\n").unwrap();
        assert_eq!(cfg.chunking.chunk_size, 500);
        assert_eq!(cfg.chunking.overlap, 50);
        assert_eq!(cfg.vocabulary.max_features, 384);
        assert_eq!(cfg.retrieval.top_k, 5);
        assert_eq!(cfg.retrieval.max_retries, 3);
        assert_eq!(
            cfg.search_params(None).stale_policy,
            StalePolicy::Revectorize
        );
    }

    #[test]
    fn test_top_k_override() {
        let cfg = parse("[db]\npath = \"x\"\n[retrieval]\ntop_k = 7\n").unwrap();
        assert_eq!(cfg.search_params(None).top_k, 7);
        assert_eq!(cfg.search_params(Some(2)).top_k, 2);
    }

    #[test]
    fn test_rejects_overlap_not_below_size() {
        let err = parse("[db]\npath = \"x\"\n[chunking]\nchunk_size = 10\noverlap = 10\n")
            .unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_rejects_zero_top_k() {
        assert!(parse("[db]\npath = \"x\"\n[retrieval]\ntop_k = 0\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_stale_policy() {
        let err = parse("[db]\npath = \"x\"\n[retrieval]\nstale_policy = \"drop\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("stale_policy"));
    }

    #[test]
    fn test_missing_db_section_fails() {
        assert!(parse("[chunking]\nchunk_size = 100\n").is_err());
    }
}
