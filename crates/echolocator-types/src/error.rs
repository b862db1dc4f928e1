use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Boundary-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Embedding,
    Storage,
    NotFound,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Embedding => write!(f, "embedding"),
            ErrorKind::Storage => write!(f, "storage"),
            ErrorKind::NotFound => write!(f, "not_found"),
        }
    }
}

/// Errors from the external embedding service.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),

    #[error("embedding timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedding input rejected: {0}")]
    Rejected(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbeddingError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::Unavailable(_) | EmbeddingError::Timeout(_))
    }
}

/// Errors from repository operations (used by trait definitions in echolocator-core).
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Connection)
    }
}

/// Errors from the external asset (image) store.
#[derive(Debug, Clone, Error)]
pub enum AssetError {
    #[error("asset io error: {0}")]
    Io(String),

    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("invalid asset reference: {0}")]
    InvalidReference(String),
}

impl AssetError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AssetError::Io(_))
    }
}

/// Engine-level error taxonomy.
///
/// Every failure the engine surfaces is one of these four kinds. Lower
/// layers convert into this type with `?`; nothing is swallowed.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Embedding(_) => ErrorKind::Embedding,
            EngineError::Storage(_) => ErrorKind::Storage,
            EngineError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

impl From<RepositoryError> for EngineError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => EngineError::NotFound("item not found".to_string()),
            other => EngineError::Storage(other.to_string()),
        }
    }
}

impl From<AssetError> for EngineError {
    fn from(e: AssetError) -> Self {
        match e {
            AssetError::NotFound(r) => EngineError::NotFound(format!("asset '{r}'")),
            other => EngineError::Storage(other.to_string()),
        }
    }
}
