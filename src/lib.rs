//! # docchat
//!
//! Retrieval-augmented chat over uploaded documents.
//!
//! Documents are grouped into projects. Each upload is converted to text,
//! split into fixed-size chunks, embedded, and stored. A question is
//! answered by ranking the project's chunks against it and sending the
//! best ones, together with the conversation so far, to a chat-completions
//! backend.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────┐   ┌──────────┐
//! │  Upload  │──▶│ Extract ▸ Chunk  │──▶│  SQLite  │
//! │ txt/pdf/ │   │     ▸ Embed      │   │ messages │
//! │   docx   │   └──────────────────┘   └────┬─────┘
//! └──────────┘                               │
//!                 ┌──────────────────┐       │
//!   question ────▶│    Retriever     │◀──────┘
//!                 └────────┬─────────┘
//!                          ▼
//!                 ┌──────────────────┐
//!                 │  Chat backend    │──▶ answer
//!                 └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docchat init
//! docchat ingest handbook.pdf --project onboarding
//! docchat ask "How many vacation days do I get?" --project onboarding
//! docchat history --project onboarding
//! docchat delete-project onboarding
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite chunk and history store |
//! | [`extract`] | txt / pdf / docx text extraction |
//! | [`embedding`] | Embedding backends |
//! | [`backend`] | HTTP chat-completions client |
//! | [`timeout`] | Deadlines for store and embedder calls |
//! | [`pipeline`] | Ingest and query orchestration |
//!
//! Backend-agnostic types, chunking, ranking, and the storage traits live
//! in the `docchat-core` crate.

pub mod backend;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod logging;
pub mod migrate;
pub mod pipeline;
pub mod sqlite_store;
pub mod timeout;
