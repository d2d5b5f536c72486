//! API request/response models for contacts.

use super::pagination::Pagination;
use crate::api::validation::{Validate, Validator};
use crate::db::models::contacts::ContactDBResponse;
use crate::types::{ContactId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactCreate {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Validate for ContactCreate {
    fn validate(&self, v: &mut Validator) {
        v.length("name", &self.name, 1, 100);
        validate_phone(v, &self.phone);
        if let Some(email) = &self.email {
            v.email("email", email);
        }
        v.unique("tags", &self.tags);
    }
}

/// Partial update. `email: null` removes the stored address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl Validate for ContactUpdate {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("name", self.name.as_deref(), 1, 100);
        if let Some(phone) = &self.phone {
            validate_phone(v, phone);
        }
        if let Some(Some(email)) = &self.email {
            v.email("email", email);
        }
        if let Some(tags) = &self.tags {
            v.unique("tags", tags);
        }
    }
}

/// Digits with an optional leading `+`, after removing spaces and dashes.
fn validate_phone(v: &mut Validator, phone: &str) {
    let normalized = normalize_phone(phone);
    let digits = normalized.strip_prefix('+').unwrap_or(&normalized);
    v.check(
        (5..=20).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()),
        "phone",
        "must be a phone number",
    );
}

pub(crate) fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')')).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ContactId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ContactDBResponse> for ContactResponse {
    fn from(db: ContactDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            phone: db.phone,
            email: db.email,
            tags: db.tags,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactListResponse {
    pub contacts: Vec<ContactResponse>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListContactsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
    /// Case-insensitive match on name or phone
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::validation::validate;

    #[test]
    fn test_phone_rules() {
        assert_eq!(normalize_phone("+1 (555) 010-0100"), "+15550100100");

        let mut contact = ContactCreate {
            name: "Ada".into(),
            phone: "+1 555-0100".into(),
            email: None,
            tags: vec!["vip".into()],
        };
        assert!(validate(&contact).is_ok());

        contact.phone = "call me".into();
        assert!(validate(&contact).is_err());
    }
}
