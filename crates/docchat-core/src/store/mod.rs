//! Storage abstraction for docchat.
//!
//! Document chunks and chat turns share one project-scoped message table
//! in the backing store, told apart by [`Role`]. The [`ChunkStore`] trait
//! covers the document rows the retriever reads; [`HistoryStore`] covers
//! the chat transcript.
//!
//! Every operation is scoped to a single project. Nothing reads across
//! projects.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`append`](ChunkStore::append) | Persist a batch of chunk records |
//! | [`list_by_project`](ChunkStore::list_by_project) | Full scan of a project's chunks |
//! | [`delete_by_project`](ChunkStore::delete_by_project) | Cascade-delete a project |
//! | [`append_message`](HistoryStore::append_message) | Persist one chat turn |
//! | [`load_history`](HistoryStore::load_history) | Transcript in append order |

pub mod memory;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{HistoryEntry, Role, StoredChunkRecord};

/// Persistence of embedded document chunks.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Persist `records`.
    ///
    /// Implementations document whether a failed batch is rolled back; the
    /// bundled stores are atomic per batch.
    async fn append(&self, records: &[StoredChunkRecord]) -> Result<()>;

    /// All chunk records of `project`, in insertion order.
    async fn list_by_project(&self, project: &str) -> Result<Vec<StoredChunkRecord>>;

    /// Remove every row of `project`, chat history included.
    ///
    /// Idempotent: deleting an empty or unknown project succeeds.
    async fn delete_by_project(&self, project: &str) -> Result<()>;
}

/// Persistence of chat turns.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist one turn. Only [`Role::User`] and [`Role::Assistant`] are
    /// accepted; other roles fail with `InvalidArgument`.
    async fn append_message(&self, project: &str, role: Role, content: &str) -> Result<()>;

    /// User and assistant turns of `project`, oldest first.
    async fn load_history(&self, project: &str) -> Result<Vec<HistoryEntry>>;
}

/// Reject roles that are not chat turns.
pub fn require_chat_role(role: Role) -> Result<()> {
    match role {
        Role::User | Role::Assistant => Ok(()),
        other => Err(Error::InvalidArgument(format!(
            "chat history accepts user or assistant turns, got {}",
            other
        ))),
    }
}
