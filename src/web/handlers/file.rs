//! File handlers for the HTTP API.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::file::UploadRequest;
use crate::web::dto::{ApiResponse, DeleteResponse, FileResponse};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::AppState;

/// Multipart field carrying the file content.
const FILE_FIELD: &str = "file";

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped, quotes and backslashes are replaced in the
/// plain `filename` parameter, and non-ASCII names get an RFC 5987
/// `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{}\"", filename);
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}

/// GET /files - List all files.
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "All file records in insertion order", body = Vec<FileResponse>),
        (status = 500, description = "Metadata store failure", body = ErrorBody)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let files = state.files.list().await?;

    Ok(Json(ApiResponse::new(
        files.into_iter().map(FileResponse::from).collect(),
    )))
}

/// GET /files/:name - Get file metadata.
#[utoipa::path(
    get,
    path = "/files/{name}",
    tag = "files",
    params(
        ("name" = String, Path, description = "File name")
    ),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 404, description = "File not found", body = ErrorBody)
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.files.get(&name).await?;

    Ok(Json(ApiResponse::new(file.into())))
}

/// GET /files/:name/content - Download file content.
#[utoipa::path(
    get,
    path = "/files/{name}/content",
    tag = "files",
    params(
        ("name" = String, Path, description = "File name")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 500, description = "Blob missing or unreadable", body = ErrorBody)
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let download = state.files.download(&name).await?;

    let content_type = mime_guess::from_path(&download.metadata.name)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&download.metadata.name),
        )
        .header(header::CONTENT_LENGTH, download.content.len())
        .body(Body::from(download.content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// POST /files/:name - Upload a file.
///
/// The content is taken from the multipart field `file`; the stored name is
/// the path segment, not the client-side file name.
#[utoipa::path(
    post,
    path = "/files/{name}",
    tag = "files",
    params(
        ("name" = String, Path, description = "File name to store under")
    ),
    responses(
        (status = 200, description = "File uploaded", body = FileResponse),
        (status = 400, description = "Invalid multipart body or validation failure", body = ErrorBody),
        (status = 500, description = "Duplicate name or store failure", body = ErrorBody)
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let mut content = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if field.name() == Some(FILE_FIELD) {
            content = Some(field.bytes().await.map_err(|e| {
                tracing::warn!("Failed to read file content: {}", e);
                ApiError::bad_request("Failed to read file")
            })?);
        }
    }

    let content = content.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    let file = state
        .files
        .upload(UploadRequest::from_bytes(name, content))
        .await?;

    Ok(Json(ApiResponse::new(file.into())))
}

/// DELETE /files/:name - Delete a file.
#[utoipa::path(
    delete,
    path = "/files/{name}",
    tag = "files",
    params(
        ("name" = String, Path, description = "File name")
    ),
    responses(
        (status = 200, description = "File deleted", body = DeleteResponse),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<DeleteResponse>>, ApiError> {
    state.files.delete(&name).await?;

    Ok(Json(ApiResponse::new(DeleteResponse {
        name,
        deleted: true,
    })))
}
