//! HTTP/REST API layer for Echo-Locator.
//!
//! Axum-based REST API at `/api/` with an envelope response format, CORS
//! from configuration, and the upload directory served under `/uploads`.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
