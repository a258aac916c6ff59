//! blob-gateway-axum: HTTP endpoint for `blob-gateway`.
//!
//! Mounts the upload, batch presign and batch delete operations as JSON and
//! multipart routes:
//!
//! - `POST /blob/upload`
//! - `POST /blob/presign`
//! - `POST /blob/delete`
//! - `GET /health`

pub mod app;
pub mod config;
mod error;
pub mod routes;
pub mod state;

pub use app::GatewayApp;
pub use config::{GatewayConfig, StoreKind};
pub use error::GatewayError;
pub use state::GatewayState;
