//! Error types for the document store.

use otds_core::OtError;
use thiserror::Error;

/// Errors that can occur in store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// Validation, apply and transform failures from the engine.
    #[error(transparent)]
    Ot(#[from] OtError),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Op at future version: submitted {submitted}, head {head}")]
    FutureVersion { submitted: u64, head: u64 },

    #[error("Op too old: {behind} ops behind, limit {limit}")]
    OpTooOld { behind: u64, limit: u64 },

    #[error("Op already submitted: {src} seq {seq}")]
    DuplicateOp { src: String, seq: u64 },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DbError {
    /// The engine error underneath, if any.
    pub fn ot(&self) -> Option<&OtError> {
        match self {
            DbError::Ot(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
