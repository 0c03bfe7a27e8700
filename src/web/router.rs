//! Router configuration for the HTTP API.

use axum::{extract::DefaultBodyLimit, routing::get, Json, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::dto::{DeleteResponse, FileResponse};
use super::error::{ErrorBody, ErrorCode, ErrorDetail};
use super::handlers::{self, delete_file, download_file, get_file, list_files, upload_file, AppState};
use super::middleware::create_cors_layer;

/// OpenAPI document for the file API.
#[derive(OpenApi)]
#[openapi(
    info(title = "filedepot", description = "File storage API"),
    paths(
        handlers::file::list_files,
        handlers::file::get_file,
        handlers::file::download_file,
        handlers::file::upload_file,
        handlers::file::delete_file,
    ),
    components(schemas(FileResponse, DeleteResponse, ErrorBody, ErrorDetail, ErrorCode)),
    tags((name = "files", description = "Upload, list, download and delete files"))
)]
pub struct ApiDoc;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    cors_origins: &[String],
    max_request_bytes: usize,
) -> Router {
    let file_routes = Router::new()
        .route("/files", get(list_files))
        .route(
            "/files/:name",
            get(get_file).post(upload_file).delete(delete_file),
        )
        .route("/files/:name/content", get(download_file));

    Router::new()
        .route("/", get(ping))
        .merge(file_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(DefaultBodyLimit::max(max_request_bytes)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Create the router serving the OpenAPI document.
pub fn create_openapi_router() -> Router {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

/// Ping handler.
async fn ping() -> Json<&'static str> {
    Json("Hello")
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
