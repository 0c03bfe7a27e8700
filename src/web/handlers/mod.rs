//! API handlers for the HTTP interface.

pub mod file;

pub use file::*;

use crate::file::{FileRepository, FileService, FileStorage};

/// File service over the SQLite metadata store and the filesystem blob store.
pub type DepotService = FileService<FileRepository, FileStorage>;

/// Application state shared with every handler.
pub struct AppState {
    /// File service.
    pub files: DepotService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(files: DepotService) -> Self {
        Self { files }
    }
}
