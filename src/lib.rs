//! # Recall
//!
//! A local-first document retrieval engine. Documents are split into
//! overlapping chunks, each chunk is turned into a TF-IDF vector over a
//! vocabulary fit on the stored corpus, and queries are answered by cosine
//! similarity against those vectors.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │  Documents  │──▶│ IndexingPipeline │──▶│    SQLite    │
//! │ (recall add)│   │ chunk + vectorize│   │ chunks+vocab │
//! └─────────────┘   └────────┬─────────┘   └──────┬───────┘
//!                            │ publish            │
//!                     ┌──────▼───────┐     ┌──────▼───────┐
//!                     │ModelRegistry │────▶│    search    │
//!                     └──────────────┘     └──────────────┘
//! ```
//!
//! The algorithms (tokenizer, vocabulary, vectorizer, chunker, index,
//! search) live in the `recall-core` crate. This crate adds the SQLite
//! store, the async indexing pipeline, and the `recall` CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! recall init
//! recall add notes/*.md
//! recall index --pending
//! recall search "deployment checklist"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the store trait |
//! | [`pipeline`] | Chunk, fit, vectorize, persist |
//! | [`engine`] | Store + registry + pipeline for a host application |
//! | [`progress`] | Indexing progress reporters |
//! | [`cancel`] | Cooperative cancellation |
//! | [`documents`] | `add`, `docs`, `get`, `delete` |
//! | [`index_cmd`] | `index`, `refresh` |
//! | [`search_cmd`] | `search`, `vocab` |
//! | [`stats`] | `stats` |

pub mod cancel;
pub mod config;
pub mod db;
pub mod documents;
pub mod engine;
pub mod index_cmd;
pub mod migrate;
pub mod pipeline;
pub mod progress;
pub mod search_cmd;
pub mod sqlite_store;
pub mod stats;

pub use recall_core;
