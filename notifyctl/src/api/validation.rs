//! Request body validation.
//!
//! Handlers take [`ValidatedJson<T>`] instead of `Json<T>`. Malformed bodies (bad JSON, wrong
//! types, missing fields, unknown enum values) and rule violations reported by
//! [`Validate::validate`] both become a 400 with a list of `{field, message}` errors.

use std::collections::HashSet;
use std::hash::Hash;

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::errors::{Error, FieldError};

/// Rules checked after a body has been deserialized.
pub trait Validate {
    fn validate(&self, v: &mut Validator);
}

/// JSON body extractor that runs [`Validate`].
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|rejection| Error::Validation {
            errors: vec![FieldError::new("body", rejection.body_text())],
        })?;

        let mut validator = Validator::default();
        value.validate(&mut validator);
        validator.finish()?;

        Ok(Self(value))
    }
}

/// Accumulates field errors so a client sees every problem at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn error(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors.push(FieldError::new(field, message));
        self
    }

    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.error(field, message);
        }
        self
    }

    /// Character length of the trimmed value must be within `min..=max`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.trim().chars().count();
        self.check(
            (min..=max).contains(&len),
            field,
            format!("must be between {min} and {max} characters"),
        )
    }

    pub fn optional_length(&mut self, field: &str, value: Option<&str>, min: usize, max: usize) -> &mut Self {
        if let Some(value) = value {
            self.length(field, value, min, max);
        }
        self
    }

    /// Length rule for a nullable field of a partial update. An explicit `null` always passes.
    pub fn patch_length(&mut self, field: &str, value: &Option<Option<String>>, min: usize, max: usize) -> &mut Self {
        self.optional_length(field, value.as_ref().and_then(|v| v.as_deref()), min, max)
    }

    pub fn min<T: PartialOrd + Copy + std::fmt::Display>(&mut self, field: &str, value: T, min: T) -> &mut Self {
        self.check(value >= min, field, format!("must be greater than or equal to {min}"))
    }

    pub fn optional_min<T: PartialOrd + Copy + std::fmt::Display>(&mut self, field: &str, value: Option<T>, min: T) -> &mut Self {
        if let Some(value) = value {
            self.min(field, value, min);
        }
        self
    }

    /// `0 <= value < below`, with at most `scale` significant decimal places.
    pub fn decimal(&mut self, field: &str, value: Decimal, below: Decimal, scale: u32) -> &mut Self {
        if value < Decimal::ZERO || value >= below {
            return self.error(field, format!("must be between 0 and {below} (exclusive)"));
        }
        self.check(
            value.normalize().scale() <= scale,
            field,
            format!("must have at most {scale} decimal places"),
        )
    }

    pub fn optional_decimal(&mut self, field: &str, value: Option<Decimal>, below: Decimal, scale: u32) -> &mut Self {
        if let Some(value) = value {
            self.decimal(field, value, below, scale);
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        let value = value.trim();
        let valid = value.len() <= 255
            && value
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'));
        self.check(valid, field, "must be a valid email address")
    }

    /// Non-empty list without duplicates.
    pub fn non_empty_unique<T: Eq + Hash>(&mut self, field: &str, values: &[T]) -> &mut Self {
        if values.is_empty() {
            return self.error(field, "must contain at least one entry");
        }
        self.unique(field, values)
    }

    pub fn unique<T: Eq + Hash>(&mut self, field: &str, values: &[T]) -> &mut Self {
        let mut seen = HashSet::new();
        let has_duplicates = !values.iter().all(|v| seen.insert(v));
        self.check(!has_duplicates, field, "must not contain duplicates")
    }

    pub fn finish(self) -> Result<(), Error> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation { errors: self.errors })
        }
    }
}

/// Run a value's rules outside of the extractor (e.g. for partial updates composed in handlers).
pub fn validate<T: Validate>(value: &T) -> Result<(), Error> {
    let mut validator = Validator::default();
    value.validate(&mut validator);
    validator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Widget {
        name: String,
        count: i64,
        tags: Vec<String>,
    }

    impl Validate for Widget {
        fn validate(&self, v: &mut Validator) {
            v.length("name", &self.name, 2, 10)
                .min("count", self.count, 0)
                .non_empty_unique("tags", &self.tags);
        }
    }

    async fn accept(ValidatedJson(widget): ValidatedJson<Widget>) -> String {
        widget.name
    }

    fn server() -> TestServer {
        TestServer::new(Router::new().route("/widgets", post(accept))).unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let response = server()
            .post("/widgets")
            .json(&serde_json::json!({ "name": "gear", "count": 3, "tags": ["a"] }))
            .await;
        response.assert_status_ok();
        response.assert_text("gear");
    }

    #[tokio::test]
    async fn test_rule_violations_are_collected() {
        let response = server()
            .post("/widgets")
            .json(&serde_json::json!({ "name": " x ", "count": -1, "tags": ["a", "a"] }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], false);
        let fields: Vec<&str> = body["errors"].as_array().unwrap().iter().map(|e| e["field"].as_str().unwrap()).collect();
        assert_eq!(fields, vec!["name", "count", "tags"]);
    }

    #[tokio::test]
    async fn test_missing_fields_are_bad_request() {
        let response = server().post("/widgets").json(&serde_json::json!({ "name": "gear" })).await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: serde_json::Value = response.json();
        assert_eq!(body["errors"][0]["field"], "body");
    }

    #[test]
    fn test_email_rule() {
        let mut v = Validator::default();
        v.email("a", "user@example.com").email("b", "nope").email("c", "x@localhost").email("d", "@example.com");
        let err = v.finish().unwrap_err();
        match err {
            Error::Validation { errors } => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["b", "c", "d"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
