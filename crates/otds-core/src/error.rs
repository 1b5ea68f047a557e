//! Error types for the consistency core.
//!
//! Every failure the core reports, whether a malformed request, a state
//! conflict or a type provider fault, surfaces as an [`OtError`]. The
//! display strings are stable and meant to be matched on by callers.

use thiserror::Error;

/// Errors produced while validating, applying or transforming operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtError {
    // Malformed request
    #[error("Missing request")]
    MissingRequest,

    #[error("Missing op, create, or del")]
    MissingAction,

    #[error("Missing create type")]
    MissingCreateType,

    #[error("Unknown type")]
    UnknownType,

    #[error("del value must be true")]
    InvalidDelete,

    #[error("Invalid src")]
    InvalidSrc,

    #[error("Invalid seq")]
    InvalidSeq,

    #[error("seq but not src")]
    SeqWithoutSrc,

    #[error("Invalid metadata")]
    InvalidMetadata,

    #[error("Invalid version")]
    InvalidVersion,

    #[error("Invalid prev")]
    InvalidPrev,

    // State conflict
    #[error("Version mismatch")]
    VersionMismatch,

    #[error("Document already exists")]
    DocumentExists,

    #[error("Document does not exist")]
    DocumentMissing,

    #[error("Type not found")]
    TypeNotFound,

    // Transform conflict
    #[error("Document was deleted")]
    DocumentDeleted,

    #[error("Document created remotely")]
    DocumentCreatedRemotely,

    // Presence validation
    #[error("Path must be an array")]
    PathNotArray,

    #[error("Cannot set reserved value")]
    ReservedValue,

    #[error("Cannot use non-string key")]
    NonStringKey,

    #[error("Path too deep")]
    PathTooDeep,

    /// A `preValidate`/`validate` hook refused the request.
    #[error("{0}")]
    Rejected(String),

    /// A type provider failed; the message is passed through untouched.
    #[error("{0}")]
    Provider(String),
}

impl OtError {
    /// Stable numeric code for machine handling.
    pub fn code(&self) -> u16 {
        match self {
            OtError::MissingRequest => 4001,
            OtError::MissingAction => 4002,
            OtError::MissingCreateType => 4003,
            OtError::UnknownType => 4004,
            OtError::InvalidDelete => 4005,
            OtError::InvalidSrc => 4006,
            OtError::InvalidSeq => 4007,
            OtError::SeqWithoutSrc => 4008,
            OtError::InvalidMetadata => 4009,
            OtError::InvalidVersion => 4010,
            OtError::InvalidPrev => 4011,
            OtError::VersionMismatch => 4101,
            OtError::DocumentExists => 4102,
            OtError::DocumentMissing => 4103,
            OtError::TypeNotFound => 4104,
            OtError::DocumentDeleted => 4201,
            OtError::DocumentCreatedRemotely => 4202,
            OtError::PathNotArray => 4301,
            OtError::ReservedValue => 4302,
            OtError::NonStringKey => 4303,
            OtError::PathTooDeep => 4304,
            OtError::Rejected(_) => 4401,
            OtError::Provider(_) => 5001,
        }
    }

    /// True for errors that leave the document untouched and may succeed
    /// after the caller catches up with intervening operations.
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, OtError::VersionMismatch)
    }
}

/// Failure reported by a type provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ProviderError> for OtError {
    fn from(err: ProviderError) -> Self {
        OtError::Provider(err.message)
    }
}

pub type Result<T> = std::result::Result<T, OtError>;
