//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures
//! - **[`validation`]**: Field-level payload validation and the `ValidatedJson` extractor

pub mod handlers;
pub mod models;
pub mod validation;
