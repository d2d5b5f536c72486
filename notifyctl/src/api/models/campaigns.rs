//! API request/response models for campaigns.

use super::{common::Channel, pagination::Pagination};
use crate::api::validation::{Validate, Validator};
use crate::db::models::campaigns::CampaignDBResponse;
use crate::types::{CampaignId, TemplateId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "campaign_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Running,
    Paused,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CampaignCreate {
    pub name: String,
    pub channel: Channel,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub template_id: Option<TemplateId>,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub audience_size: i32,
}

impl Validate for CampaignCreate {
    fn validate(&self, v: &mut Validator) {
        v.length("name", &self.name, 2, 100).min("audience_size", self.audience_size, 0);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CampaignUpdate {
    pub name: Option<String>,
    pub channel: Option<Channel>,
    pub status: Option<CampaignStatus>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub template_id: Option<TemplateId>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub audience_size: Option<i32>,
}

impl Validate for CampaignUpdate {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("name", self.name.as_deref(), 2, 100)
            .optional_min("audience_size", self.audience_size, 0);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CampaignResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: CampaignId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    pub channel: Channel,
    pub status: CampaignStatus,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub template_id: Option<TemplateId>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub audience_size: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CampaignDBResponse> for CampaignResponse {
    fn from(db: CampaignDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            channel: db.channel,
            status: db.status,
            template_id: db.template_id,
            scheduled_at: db.scheduled_at,
            audience_size: db.audience_size,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CampaignListResponse {
    pub campaigns: Vec<CampaignResponse>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListCampaignsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
    /// Only return campaigns in this status
    pub status: Option<CampaignStatus>,
}
