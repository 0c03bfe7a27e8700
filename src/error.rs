//! Error types for filedepot.

use std::fmt;

use thiserror::Error;

use crate::file::{StorageError, StoreError, ValidationError};

/// Workflow step at which an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Upload: looking for an existing record with the same name.
    DuplicateCheck,
    /// Upload: streaming bytes into the blob store.
    BlobWrite,
    /// Upload: inserting the metadata record.
    MetadataCommit,
    /// Delete: looking up the record to delete.
    ExistenceCheck,
    /// Delete: removing the blob.
    BlobRemove,
    /// Delete: removing the metadata record.
    MetadataRemove,
    /// Read-only metadata access (list / get).
    Lookup,
    /// Reading blob bytes for a download.
    BlobRead,
}

impl Step {
    /// Human-readable step name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::DuplicateCheck => "duplicate check",
            Step::BlobWrite => "blob write",
            Step::MetadataCommit => "metadata commit",
            Step::ExistenceCheck => "existence check",
            Step::BlobRemove => "blob remove",
            Step::MetadataRemove => "metadata remove",
            Step::Lookup => "lookup",
            Step::BlobRead => "blob read",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common error type for filedepot.
#[derive(Error, Debug)]
pub enum DepotError {
    /// No file with the given name exists.
    #[error("{0} not found")]
    NotFound(String),

    /// A file with the given name already exists.
    #[error("file already exists: {0}")]
    Conflict(String),

    /// The upload was rejected before anything was written.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Filesystem failure in the blob store.
    #[error("storage error during {step}: {source}")]
    Storage { step: Step, source: StorageError },

    /// Failure in the metadata store.
    #[error("metadata store error during {step}: {source}")]
    Store { step: Step, source: StoreError },

    /// Database setup or migration error.
    ///
    /// Errors from sqlx outside the metadata store are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DepotError {
    pub(crate) fn storage(step: Step, source: StorageError) -> Self {
        DepotError::Storage { step, source }
    }

    pub(crate) fn store(step: Step, source: StoreError) -> Self {
        DepotError::Store { step, source }
    }

    /// The failed workflow step, if the error came from one of the stores.
    pub fn step(&self) -> Option<Step> {
        match self {
            DepotError::Storage { step, .. } | DepotError::Store { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for DepotError {
    fn from(e: sqlx::Error) -> Self {
        DepotError::Database(e.to_string())
    }
}

/// Result type alias for filedepot operations.
pub type Result<T> = std::result::Result<T, DepotError>;
