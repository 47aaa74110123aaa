//! Error taxonomy shared by every pipeline stage.

use thiserror::Error;

/// Convenience alias used throughout the core crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures raised by the ingest and query pipelines.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad caller-supplied parameter (e.g. a zero chunk length or `k`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Text could not be extracted or decoded from an uploaded document.
    #[error("document unreadable: {0}")]
    DocumentUnreadable(String),

    /// The declared document type has no extraction path.
    #[error("unsupported document type: '{0}' (expected txt, pdf or docx)")]
    UnsupportedDocumentType(String),

    /// The embedding model could not be loaded or invoked.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The persistent store rejected an operation.
    #[error("store error during {operation}: {message}")]
    Store {
        operation: &'static str,
        message: String,
    },

    /// An external call exceeded its time budget.
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// The generation backend failed and the caller asked for hard failures.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl Error {
    pub fn store(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Error::Store {
            operation,
            message: err.to_string(),
        }
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. } | Error::Store { .. } | Error::Backend(_)
        )
    }
}

/// Failures talking to the generation backend.
///
/// The `Display` output doubles as the chat-visible text when the pipeline
/// renders backend errors as answers, so it always names the HTTP status or
/// the underlying cause.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    /// Non-success HTTP status.
    #[error("API Error: {status} - {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS, or other transport failure.
    #[error("An error occurred while calling the API: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("An error occurred while calling the API: request timed out after {0}s")]
    Timeout(u64),

    /// A success status with a body that is not JSON.
    #[error("An error occurred while calling the API: invalid response body: {0}")]
    Decode(String),
}
