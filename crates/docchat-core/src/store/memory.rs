//! In-memory [`ChunkStore`] and [`HistoryStore`] for tests and embedding.
//!
//! Rows live in a single `Vec` behind a `std::sync::RwLock`, mirroring the
//! shared message table of the SQLite backend. Appends are atomic: a batch
//! either lands completely or not at all.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::{HistoryEntry, Role, StoredChunkRecord};

use super::{ChunkStore, HistoryStore};

enum Row {
    Chunk(StoredChunkRecord),
    Message(String, HistoryEntry),
}

impl Row {
    fn project(&self) -> &str {
        match self {
            Row::Chunk(r) => &r.project,
            Row::Message(p, _) => p,
        }
    }
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    rows: RwLock<Vec<Row>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows (chunks and messages) across all projects.
    pub fn len(&self) -> usize {
        self.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Row>>> {
        self.rows
            .read()
            .map_err(|_| Error::store("read", "in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Row>>> {
        self.rows
            .write()
            .map_err(|_| Error::store("write", "in-memory store lock poisoned"))
    }
}

#[async_trait]
impl ChunkStore for InMemoryStore {
    async fn append(&self, records: &[StoredChunkRecord]) -> Result<()> {
        let mut rows = self.write()?;
        rows.extend(records.iter().cloned().map(Row::Chunk));
        Ok(())
    }

    async fn list_by_project(&self, project: &str) -> Result<Vec<StoredChunkRecord>> {
        let rows = self.read()?;
        Ok(rows
            .iter()
            .filter_map(|row| match row {
                Row::Chunk(r) if r.project == project => Some(r.clone()),
                _ => None,
            })
            .collect())
    }

    async fn delete_by_project(&self, project: &str) -> Result<()> {
        let mut rows = self.write()?;
        rows.retain(|row| row.project() != project);
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn append_message(&self, project: &str, role: Role, content: &str) -> Result<()> {
        super::require_chat_role(role)?;
        let mut rows = self.write()?;
        rows.push(Row::Message(
            project.to_string(),
            HistoryEntry {
                role,
                content: content.to_string(),
                timestamp: Utc::now(),
            },
        ));
        Ok(())
    }

    async fn load_history(&self, project: &str) -> Result<Vec<HistoryEntry>> {
        let rows = self.read()?;
        Ok(rows
            .iter()
            .filter_map(|row| match row {
                Row::Message(p, e)
                    if p == project && matches!(e.role, Role::User | Role::Assistant) =>
                {
                    Some(e.clone())
                }
                _ => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(project: &str, ordinal: usize, content: &str) -> StoredChunkRecord {
        StoredChunkRecord {
            project: project.to_string(),
            ordinal,
            content: content.to_string(),
            embedding: Some(vec![1.0, 0.0]),
            embedding_model: Some("test".to_string()),
        }
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_ordered() {
        let store = InMemoryStore::new();
        store
            .append(&[record("a", 0, "a0"), record("b", 0, "b0"), record("a", 1, "a1")])
            .await
            .unwrap();

        let a = store.list_by_project("a").await.unwrap();
        let contents: Vec<&str> = a.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["a0", "a1"]);
        assert_eq!(store.list_by_project("b").await.unwrap().len(), 1);
        assert!(store.list_by_project("c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_cascades_and_is_idempotent() {
        let store = InMemoryStore::new();
        store.append(&[record("a", 0, "a0")]).await.unwrap();
        store.append_message("a", Role::User, "hi").await.unwrap();
        store.append(&[record("b", 0, "b0")]).await.unwrap();

        store.delete_by_project("a").await.unwrap();
        assert!(store.list_by_project("a").await.unwrap().is_empty());
        assert!(store.load_history("a").await.unwrap().is_empty());
        assert_eq!(store.list_by_project("b").await.unwrap().len(), 1);

        store.delete_by_project("a").await.unwrap();
        store.delete_by_project("never-existed").await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_history_rejects_document_and_system_roles() {
        let store = InMemoryStore::new();
        for role in [Role::Document, Role::System] {
            let err = store.append_message("a", role, "text").await.unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_history_keeps_append_order() {
        let store = InMemoryStore::new();
        for (i, role) in [Role::User, Role::Assistant, Role::User, Role::Assistant]
            .into_iter()
            .enumerate()
        {
            store.append_message("a", role, &i.to_string()).await.unwrap();
        }
        let contents: Vec<String> = store
            .load_history("a")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.content)
            .collect();
        assert_eq!(contents, vec!["0", "1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_history_excludes_documents_and_other_projects() {
        let store = InMemoryStore::new();
        store.append(&[record("a", 0, "doc text")]).await.unwrap();
        store.append_message("a", Role::User, "question").await.unwrap();
        store.append_message("b", Role::User, "elsewhere").await.unwrap();
        store.append_message("a", Role::Assistant, "answer").await.unwrap();

        let history = store.load_history("a").await.unwrap();
        let turns: Vec<(Role, &str)> = history
            .iter()
            .map(|e| (e.role, e.content.as_str()))
            .collect();
        assert_eq!(
            turns,
            vec![(Role::User, "question"), (Role::Assistant, "answer")]
        );
    }
}
