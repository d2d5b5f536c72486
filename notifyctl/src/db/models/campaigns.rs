//! Database models for campaigns.

use crate::api::models::campaigns::{CampaignCreate, CampaignStatus, CampaignUpdate};
use crate::api::models::common::Channel;
use crate::types::{CampaignId, TemplateId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct CampaignCreateDBRequest {
    pub user_id: UserId,
    pub name: String,
    pub channel: Channel,
    pub template_id: Option<TemplateId>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub audience_size: i32,
}

impl CampaignCreateDBRequest {
    pub fn new(user_id: UserId, api: CampaignCreate) -> Self {
        Self {
            user_id,
            name: api.name.trim().to_string(),
            channel: api.channel,
            template_id: api.template_id,
            scheduled_at: api.scheduled_at,
            audience_size: api.audience_size,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CampaignUpdateDBRequest {
    pub name: Option<String>,
    pub channel: Option<Channel>,
    pub status: Option<CampaignStatus>,
    pub template_id: Option<TemplateId>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub audience_size: Option<i32>,
}

impl From<CampaignUpdate> for CampaignUpdateDBRequest {
    fn from(api: CampaignUpdate) -> Self {
        Self {
            name: api.name.map(|n| n.trim().to_string()),
            channel: api.channel,
            status: api.status,
            template_id: api.template_id,
            scheduled_at: api.scheduled_at,
            audience_size: api.audience_size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CampaignDBResponse {
    pub id: CampaignId,
    pub user_id: UserId,
    pub name: String,
    pub channel: Channel,
    pub status: CampaignStatus,
    pub template_id: Option<TemplateId>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub audience_size: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
