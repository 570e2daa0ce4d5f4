// shoplist/src/error.rs

use thiserror::Error;

/// Why a candidate item name was refused.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("item name cannot be empty")]
    EmptyName,
    #[error("item name must be {max} characters or less (got {len})")]
    NameTooLong { len: usize, max: usize },
}

/// Rejections produced by the list store. They never escape as hard failures:
/// the store records the message in `ListState::error` and hands the value back.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ListError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no item with id {id}")]
    NotFound { id: String },
}

/// Persistence failures. Reasons are kept as text so the error can travel on
/// channels and be compared in tests.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("failed to read {key}: {reason}")]
    Read { key: String, reason: String },
    #[error("failed to write {key}: {reason}")]
    Write { key: String, reason: String },
}

impl StorageError {
    pub fn read(key: &str, reason: impl std::fmt::Display) -> Self {
        Self::Read { key: key.to_string(), reason: reason.to_string() }
    }
    pub fn write(key: &str, reason: impl std::fmt::Display) -> Self {
        Self::Write { key: key.to_string(), reason: reason.to_string() }
    }
    pub fn key(&self) -> &str {
        match self { Self::Read { key, .. } | Self::Write { key, .. } => key }
    }
}
