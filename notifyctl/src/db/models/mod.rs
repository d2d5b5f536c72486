//! Database record models.
//!
//! Each submodule holds the `*CreateDBRequest` / `*UpdateDBRequest` / `*DBResponse` types that
//! the repositories in [`crate::db::handlers`] accept and return. They are kept separate from the
//! API models so storage and wire shapes can evolve independently.
//!
//! # JSON columns
//!
//! List-valued columns (`channels_allowed`, `channels_enabled`, `permissions`, `tags`, ...) are
//! `JSONB` arrays. Rows select them as [`serde_json::Value`] and decode with
//! [`decode_json_list`], which never fails: a value that does not decode into the expected list
//! becomes an empty list and a warning is logged. Callers rely on this, e.g. a plan with corrupt
//! `channels_allowed` still shows up in listings, offering no channels.

use serde::de::DeserializeOwned;

pub mod campaigns;
pub mod contacts;
pub mod plans;
pub mod rcs_bots;
pub mod resellers;
pub mod templates;
pub mod users;
pub mod vendors;
pub mod wallet;

/// Decode a JSONB list column, falling back to an empty list.
pub(crate) fn decode_json_list<T: DeserializeOwned>(column: &'static str, value: serde_json::Value) -> Vec<T> {
    match serde_json::from_value::<Vec<T>>(value) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(column, error = %e, "Stored JSON list could not be decoded, treating as empty");
            Vec::new()
        }
    }
}

/// Trim optional free text. Blank values are stored as NULL.
pub(crate) fn trim_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// [`trim_text`] for a nullable field of a partial update, where `Some(None)` clears the column.
pub(crate) fn trim_patch(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(trim_text)
}

/// Encode a list for binding to a JSONB column.
pub(crate) fn encode_json_list<T: serde::Serialize>(items: &[T]) -> serde_json::Value {
    serde_json::Value::Array(items.iter().filter_map(|item| serde_json::to_value(item).ok()).collect())
}
