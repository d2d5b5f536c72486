//! API request and response models.
//!
//! These are the JSON shapes clients send and receive. Database records in
//! [`crate::db::models`] convert into them via `From`, so storage details (like the stored vendor
//! API key or a user's password hash) never reach the wire.

pub mod campaigns;
pub mod common;
pub mod contacts;
pub mod envelope;
pub mod pagination;
pub mod plans;
pub mod rcs_bots;
pub mod resellers;
pub mod templates;
pub mod users;
pub mod vendors;
pub mod wallet;
