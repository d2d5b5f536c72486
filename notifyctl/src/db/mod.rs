//! Database layer: error classification, repositories and record models.
//!
//! - [`errors`]: [`errors::DbError`], built from `sqlx::Error`
//! - [`handlers`]: one repository per table
//! - [`models`]: request/response records passed to and from repositories

pub mod errors;
pub mod handlers;
pub mod models;
