//! HTTP request handlers for all API endpoints.
//!
//! Handlers are grouped by resource. Each one extracts and validates its input, checks access
//! through the auth extractors, calls a repository from [`crate::db::handlers`] and wraps the
//! result in the success envelope.
//!
//! # Handler Modules
//!
//! - [`auth`]: login and signup
//! - [`profile`]: the caller's own account and password
//! - [`plans`]: subscription plan catalogue (public reads, admin writes)
//! - [`resellers`], [`vendors`], [`users`]: platform administration
//! - [`wallet`]: credit ledger reads and admin adjustments
//! - [`rcs_bots`], [`campaigns`], [`templates`], [`contacts`]: tenant-scoped resources
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to a status code and a
//! `{success: false, message, errors?}` body.

pub mod auth;
pub mod campaigns;
pub mod contacts;
pub mod plans;
pub mod profile;
pub mod rcs_bots;
pub mod resellers;
pub mod templates;
pub mod users;
pub mod vendors;
pub mod wallet;
