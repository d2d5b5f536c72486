//! Database models for contacts.

use crate::api::models::contacts::{ContactCreate, ContactUpdate, normalize_phone};
use crate::types::{ContactId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ContactCreateDBRequest {
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub tags: Vec<String>,
}

impl ContactCreateDBRequest {
    pub fn new(user_id: UserId, api: ContactCreate) -> Self {
        Self {
            user_id,
            name: api.name.trim().to_string(),
            phone: normalize_phone(&api.phone),
            email: api.email.map(|e| e.trim().to_lowercase()),
            tags: api.tags,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContactUpdateDBRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    /// `Some(None)` clears the column
    pub email: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl From<ContactUpdate> for ContactUpdateDBRequest {
    fn from(api: ContactUpdate) -> Self {
        Self {
            name: api.name.map(|n| n.trim().to_string()),
            phone: api.phone.as_deref().map(normalize_phone),
            email: api.email.map(|e| e.map(|e| e.trim().to_lowercase())),
            tags: api.tags,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContactDBResponse {
    pub id: ContactId,
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
