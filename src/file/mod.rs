//! File management module for filedepot.
//!
//! This module provides:
//! - A blob store for file contents
//! - A metadata store for file records
//! - Upload validation rules
//! - The file service that coordinates uploads and deletions across both stores

mod metadata;
mod service;
mod storage;
mod validation;

pub use metadata::{FileRecord, FileRepository, MetadataStore, NewFile, StoreError};
pub use service::{DownloadResult, FileService, UploadRequest};
pub use storage::{bytes_stream, BlobStore, ByteStream, FileStorage, StorageError};
pub use validation::{is_safe_name, validate, ValidationError};

/// Maximum length for filename (in bytes).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Default maximum file size (8MB, exclusive).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 8 * 1024 * 1024;
