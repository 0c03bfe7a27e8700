//! filedepot - a small file storage service.
//!
//! File contents live in a blob store on disk and file records live in a
//! SQLite metadata store; the file service keeps the two in step for uploads
//! and deletions. An axum HTTP API sits on top.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{DepotError, Result, Step};
pub use file::{
    BlobStore, FileRecord, FileRepository, FileService, FileStorage, MetadataStore, NewFile,
    UploadRequest,
};
pub use web::WebServer;
