//! Response DTOs for the HTTP API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::file::FileRecord;

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// File metadata response.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    /// File ID.
    pub id: i64,
    /// File name.
    pub name: String,
    /// Location in the blob store.
    pub path: String,
    /// File size in bytes.
    pub size: i64,
    /// Created at (RFC 3339).
    pub created_at: String,
    /// Updated at (RFC 3339).
    pub updated_at: String,
}

impl From<FileRecord> for FileResponse {
    fn from(file: FileRecord) -> Self {
        Self {
            id: file.id,
            name: file.name,
            path: file.path,
            size: file.size,
            created_at: file.created_at.to_rfc3339(),
            updated_at: file.updated_at.to_rfc3339(),
        }
    }
}

/// Delete confirmation.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    /// Name of the deleted file.
    pub name: String,
    /// Always true.
    pub deleted: bool,
}
