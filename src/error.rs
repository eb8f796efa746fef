//! Error types for the document chat engine.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors raised while extracting text from an uploaded document.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("unsupported document format: {0} (convert to plain text first)")]
    UnsupportedFormat(String),

    #[error("file does not contain readable text: {0}")]
    Binary(String),
}

/// Errors from the external embedding provider.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to construct embedding client: {0}")]
    Connection(String),

    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding request timed out")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Timeout => true,
            EmbeddingError::Request(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::Api { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            EmbeddingError::Connection(_) | EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors from the external completion provider.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("completion provider error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("completion response contained no text")]
    EmptyResponse,

    #[error("invalid completion response: {0}")]
    InvalidResponse(String),

    #[error("completion request timed out")]
    Timeout,
}

impl Retryable for CompletionError {
    fn is_retryable(&self) -> bool {
        match self {
            CompletionError::Timeout => true,
            CompletionError::Request(e) => e.is_timeout() || e.is_connect(),
            CompletionError::Api { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            CompletionError::EmptyResponse | CompletionError::InvalidResponse(_) => false,
        }
    }
}

/// Errors from the session store. `NotFound` and `Expired` are distinguished
/// so callers can tell "never existed" from "TTL lapsed".
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already exists: {0}")]
    Duplicate(String),

    #[error("unknown session: {0}")]
    NotFound(String),

    #[error("session expired: {0}")]
    Expired(String),
}

/// Errors raised while ingesting a document into a session index.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not extract text from document")]
    EmptyDocument,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Errors raised while answering a question against a session.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no documents uploaded yet")]
    NoIndex,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    Path(String),
}

/// Errors related to the daemon transport.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("daemon is not running")]
    NotRunning,

    #[error("failed to spawn daemon: {0}")]
    SpawnError(String),

    #[error("timed out waiting for daemon")]
    Timeout,

    #[error("failed to connect to daemon: {0}")]
    ConnectionFailed(String),

    #[error("socket error: {0}")]
    SocketError(String),

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("upload error: {0}")]
    Ingest(#[from] IngestError),

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("daemon error: {0}")]
    Daemon(#[from] DaemonError),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_error_retryable() {
        assert!(EmbeddingError::Timeout.is_retryable());
        assert!(
            EmbeddingError::Api {
                status: 503,
                message: "unavailable".to_string()
            }
            .is_retryable()
        );
        assert!(
            !EmbeddingError::Api {
                status: 401,
                message: "bad key".to_string()
            }
            .is_retryable()
        );
        assert!(!EmbeddingError::InvalidResponse("garbage".to_string()).is_retryable());
    }

    #[test]
    fn test_completion_error_retryable() {
        assert!(
            CompletionError::Api {
                status: 429,
                message: "slow down".to_string()
            }
            .is_retryable()
        );
        assert!(!CompletionError::EmptyResponse.is_retryable());
    }

    #[test]
    fn test_session_error_messages() {
        let e = SessionError::Expired("abc".to_string());
        assert!(e.to_string().contains("expired"));
        let e = SessionError::NotFound("abc".to_string());
        assert!(e.to_string().contains("unknown"));
    }
}
