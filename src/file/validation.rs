//! Upload acceptance rules.
//!
//! Validation is pure: it looks only at the candidate record and the
//! configured size ceiling, never at either store.

use thiserror::Error;

use super::metadata::NewFile;
use super::MAX_FILENAME_LENGTH;

/// Reasons an upload is rejected before anything is written.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The file name is empty.
    #[error("name is required")]
    NameRequired,

    /// The file has no content.
    #[error("file is empty")]
    FileEmpty,

    /// The file is at or above the configured maximum size.
    #[error("file is too large ({size} bytes, limit is below {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    /// The name cannot be used as a storage key.
    #[error("invalid file name: {0}")]
    InvalidName(String),
}

/// Validate a candidate record against the upload rules.
///
/// Rules are checked in order and the first failure wins:
/// 1. empty name
/// 2. zero size
/// 3. `size >= max_size` (the bound is exclusive)
/// 4. name usable as a single path component
pub fn validate(candidate: &NewFile, max_size: u64) -> Result<(), ValidationError> {
    if candidate.name.is_empty() {
        return Err(ValidationError::NameRequired);
    }
    if candidate.size == 0 {
        return Err(ValidationError::FileEmpty);
    }
    if candidate.size >= max_size {
        return Err(ValidationError::FileTooLarge {
            size: candidate.size,
            max: max_size,
        });
    }
    if !is_safe_name(&candidate.name) {
        return Err(ValidationError::InvalidName(candidate.name.clone()));
    }
    Ok(())
}

/// Check that a name maps to exactly one file directly under the storage root.
///
/// Rejects separators, `.`/`..`, control characters and names longer than
/// [`MAX_FILENAME_LENGTH`] bytes.
pub fn is_safe_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_FILENAME_LENGTH {
        return false;
    }
    if name == "." || name == ".." {
        return false;
    }
    !name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
}
