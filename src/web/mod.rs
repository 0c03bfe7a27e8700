//! HTTP API for filedepot.
//!
//! Exposes the file service over REST: list, inspect, download, upload and
//! delete files by name.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::{AppState, DepotService};
pub use router::{create_health_router, create_openapi_router, create_router, ApiDoc};
pub use server::WebServer;
