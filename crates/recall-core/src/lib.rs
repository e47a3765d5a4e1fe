//! # Recall Core
//!
//! Shared logic for Recall: data models, tokenization, TF-IDF vocabulary
//! fitting, vectorization, chunking, the in-memory vector index, the
//! versioned model registry, the store abstraction, and the search
//! algorithm.
//!
//! This crate contains no tokio, sqlx, or filesystem I/O. The indexing
//! pipeline, SQLite store, and CLI live in the `recall` app crate.

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod registry;
pub mod search;
pub mod store;
pub mod tokenize;
pub mod vectorize;
pub mod vocabulary;

pub use error::RecallError;
