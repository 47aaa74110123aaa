//! SQLite-backed [`ChunkStore`] and [`HistoryStore`].
//!
//! Stands in for the hosted row store: one `messages` table holds document
//! chunks (`role = 'document'`, with an embedding BLOB) and chat turns
//! (`role = 'user' | 'assistant'`, no embedding). Every query filters by
//! `project`.
//!
//! [`append`](ChunkStore::append) runs in a single transaction, so a failed
//! batch leaves no partial document behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use docchat_core::embedding::{blob_to_vec, vec_to_blob};
use docchat_core::models::{HistoryEntry, Role, StoredChunkRecord};
use docchat_core::store::{require_chat_role, ChunkStore, HistoryStore};
use docchat_core::{Error, Result};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl ChunkStore for SqliteStore {
    async fn append(&self, records: &[StoredChunkRecord]) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::store("append", e))?;

        for record in records {
            let blob = record.embedding.as_deref().map(vec_to_blob);
            sqlx::query(
                r#"
                INSERT INTO messages (id, project, role, content, embedding, embedding_model,
                                      hash, ordinal, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&record.project)
            .bind(Role::Document.as_str())
            .bind(&record.content)
            .bind(blob)
            .bind(&record.embedding_model)
            .bind(content_hash(&record.content))
            .bind(record.ordinal as i64)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::store("append", e))?;
        }

        tx.commit().await.map_err(|e| Error::store("append", e))?;
        Ok(())
    }

    async fn list_by_project(&self, project: &str) -> Result<Vec<StoredChunkRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT project, content, embedding, embedding_model, ordinal
            FROM messages
            WHERE project = ? AND role = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(project)
        .bind(Role::Document.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::store("list_by_project", e))?;

        rows.iter()
            .map(|row| -> std::result::Result<StoredChunkRecord, sqlx::Error> {
                let blob: Option<Vec<u8>> = row.try_get("embedding")?;
                let ordinal: Option<i64> = row.try_get("ordinal")?;
                Ok(StoredChunkRecord {
                    project: row.try_get("project")?,
                    ordinal: ordinal.unwrap_or_default().max(0) as usize,
                    content: row.try_get("content")?,
                    embedding: blob.map(|b| blob_to_vec(&b)),
                    embedding_model: row.try_get("embedding_model")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::store("list_by_project", e))
    }

    async fn delete_by_project(&self, project: &str) -> Result<()> {
        sqlx::query("DELETE FROM messages WHERE project = ?")
            .bind(project)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::store("delete_by_project", e))?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for SqliteStore {
    async fn append_message(&self, project: &str, role: Role, content: &str) -> Result<()> {
        require_chat_role(role)?;
        sqlx::query(
            "INSERT INTO messages (id, project, role, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(project)
        .bind(role.as_str())
        .bind(content)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::store("append_message", e))?;
        Ok(())
    }

    async fn load_history(&self, project: &str) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT role, content, created_at
            FROM messages
            WHERE project = ? AND role IN ('user', 'assistant')
            ORDER BY created_at ASC, seq ASC
            "#,
        )
        .bind(project)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::store("load_history", e))?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let role: String = row
                .try_get("role")
                .map_err(|e| Error::store("load_history", e))?;
            let content: String = row
                .try_get("content")
                .map_err(|e| Error::store("load_history", e))?;
            let millis: i64 = row
                .try_get("created_at")
                .map_err(|e| Error::store("load_history", e))?;
            entries.push(HistoryEntry {
                role: role.parse()?,
                content,
                timestamp: DateTime::from_timestamp_millis(millis).unwrap_or_default(),
            });
        }
        Ok(entries)
    }
}
