//! Core data models used throughout docchat.
//!
//! These types represent the chunks, stored records, chat turns, and
//! ranking results that flow through the ingest and query pipelines.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A fixed-dimension embedding vector.
pub type Embedding = Vec<f32>;

/// A contiguous slice of a source document, bound to its project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub project: String,
    /// Position within the source document, starting at 0.
    pub ordinal: usize,
    pub content: String,
}

/// A chunk persisted together with its embedding.
///
/// `embedding` is nullable in the backing table; records without one are
/// stored but never ranked.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChunkRecord {
    pub project: String,
    pub ordinal: usize,
    pub content: String,
    pub embedding: Option<Embedding>,
    /// Identity of the model that produced `embedding`.
    pub embedding_model: Option<String>,
}

impl StoredChunkRecord {
    pub fn new(chunk: Chunk, embedding: Embedding, model: &str) -> Self {
        Self {
            project: chunk.project,
            ordinal: chunk.ordinal,
            content: chunk.content,
            embedding: Some(embedding),
            embedding_model: Some(model.to_string()),
        }
    }
}

/// A scored candidate produced by a single retrieval call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub score: f32,
    pub content: String,
}

/// Row role in the shared message table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Document,
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Document => "document",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(Role::Document),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(Error::InvalidArgument(format!("unknown role '{}'", other))),
        }
    }
}

/// One message of a chat-completions request or of the stored transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A persisted chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<HistoryEntry> for ChatMessage {
    fn from(entry: HistoryEntry) -> Self {
        ChatMessage::new(entry.role, entry.content)
    }
}

/// Declared type of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Txt,
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Txt => "txt",
            DocumentKind::Pdf => "pdf",
            DocumentKind::Docx => "docx",
        }
    }

    /// Infer the kind from a file name's extension.
    pub fn from_file_name(name: &str) -> Result<Self, Error> {
        let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        ext.to_ascii_lowercase().parse()
    }
}

impl FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "txt" => Ok(DocumentKind::Txt),
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            other => Err(Error::UnsupportedDocumentType(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Document, Role::User, Role::Assistant, Role::System] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = ChatMessage::new(Role::Assistant, "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
    }

    #[test]
    fn kind_from_file_name() {
        assert_eq!(
            DocumentKind::from_file_name("notes.TXT").unwrap(),
            DocumentKind::Txt
        );
        assert_eq!(
            DocumentKind::from_file_name("paper.v2.pdf").unwrap(),
            DocumentKind::Pdf
        );
        assert!(matches!(
            DocumentKind::from_file_name("slides.pptx"),
            Err(Error::UnsupportedDocumentType(t)) if t == "pptx"
        ));
        assert!(DocumentKind::from_file_name("README").is_err());
    }
}
