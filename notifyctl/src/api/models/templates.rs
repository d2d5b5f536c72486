//! API request/response models for message templates.

use super::{common::Channel, pagination::Pagination};
use crate::api::validation::{Validate, Validator};
use crate::db::models::templates::TemplateDBResponse;
use crate::types::{TemplateId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "template_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateCreate {
    pub name: String,
    pub channel: Channel,
    pub category: Option<String>,
    pub content: String,
}

impl Validate for TemplateCreate {
    fn validate(&self, v: &mut Validator) {
        v.length("name", &self.name, 2, 100)
            .optional_length("category", self.category.as_deref(), 0, 50)
            .length("content", &self.content, 1, 4096);
    }
}

/// Partial update. `category: null` clears the category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub channel: Option<Channel>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    pub content: Option<String>,
    pub status: Option<TemplateStatus>,
}

impl Validate for TemplateUpdate {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("name", self.name.as_deref(), 2, 100)
            .patch_length("category", &self.category, 0, 50)
            .optional_length("content", self.content.as_deref(), 1, 4096);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: TemplateId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    pub channel: Channel,
    pub category: Option<String>,
    pub content: String,
    pub status: TemplateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TemplateDBResponse> for TemplateResponse {
    fn from(db: TemplateDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            channel: db.channel,
            category: db.category,
            content: db.content,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateListResponse {
    pub templates: Vec<TemplateResponse>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListTemplatesQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
    pub channel: Option<Channel>,
}
