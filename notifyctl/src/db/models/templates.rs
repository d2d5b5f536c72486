//! Database models for message templates.

use super::{trim_patch, trim_text};
use crate::api::models::common::Channel;
use crate::api::models::templates::{TemplateCreate, TemplateStatus, TemplateUpdate};
use crate::types::{TemplateId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct TemplateCreateDBRequest {
    pub user_id: UserId,
    pub name: String,
    pub channel: Channel,
    pub category: Option<String>,
    pub content: String,
}

impl TemplateCreateDBRequest {
    pub fn new(user_id: UserId, api: TemplateCreate) -> Self {
        Self {
            user_id,
            name: api.name.trim().to_string(),
            channel: api.channel,
            category: trim_text(api.category),
            content: api.content,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateUpdateDBRequest {
    pub name: Option<String>,
    pub channel: Option<Channel>,
    /// `Some(None)` clears the column
    pub category: Option<Option<String>>,
    pub content: Option<String>,
    pub status: Option<TemplateStatus>,
}

impl From<TemplateUpdate> for TemplateUpdateDBRequest {
    fn from(api: TemplateUpdate) -> Self {
        Self {
            name: api.name.map(|n| n.trim().to_string()),
            channel: api.channel,
            category: trim_patch(api.category),
            content: api.content,
            status: api.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateDBResponse {
    pub id: TemplateId,
    pub user_id: UserId,
    pub name: String,
    pub channel: Channel,
    pub category: Option<String>,
    pub content: String,
    pub status: TemplateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
