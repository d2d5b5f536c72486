//! The `{ "success": true, ...payload }` response envelope.
//!
//! Failures use [`crate::errors::ErrorBody`], which carries `success: false`.

use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Success<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> Success<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::common::MessageResponse;

    #[test]
    fn test_payload_is_flattened() {
        let value = serde_json::to_value(Success::new(MessageResponse::new("done"))).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "message": "done" }));
    }
}
