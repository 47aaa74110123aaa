//! # docchat core
//!
//! Runtime-agnostic logic for the docchat retrieval pipeline: data models,
//! the fixed-width chunker, the embedder and store abstractions, full-scan
//! similarity ranking, and the answer-generation contract.
//!
//! This crate does no network, database, or filesystem I/O itself. The
//! `docchat` application crate supplies the SQLite store, the local
//! embedding model, and the HTTP generation backend.
//!
//! ```text
//! Document ─▶ chunk ─▶ Embedder ─▶ ChunkStore
//!                                      │
//! Question ─▶ Retriever ◀──────────────┘
//!                 │
//!                 ▼
//!          AnswerGenerator ─▶ answer text
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod models;
pub mod retrieve;
pub mod store;

pub use error::{BackendError, Error, Result};
