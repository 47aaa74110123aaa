//! Idempotent schema migrations.
//!
//! Document chunks and chat turns share the `messages` table, separated
//! by `role`. `seq` preserves insertion order for chunk listing and breaks
//! timestamp ties in the chat transcript.

use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            project TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            embedding BLOB,
            embedding_model TEXT,
            hash TEXT,
            ordinal INTEGER,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_project_role ON messages(project, role)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_messages_project_created ON messages(project, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
