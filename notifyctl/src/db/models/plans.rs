//! Database models for plans.

use crate::api::models::common::{Channel, RecordStatus};
use crate::api::models::plans::{PlanCreate, PlanUpdate};
use crate::types::PlanId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct PlanCreateDBRequest {
    pub name: String,
    pub price: Decimal,
    pub monthly_credits: i64,
    pub client_count: i32,
    pub channels_allowed: Vec<Channel>,
    pub automation_limit: i32,
    pub campaign_limit: i32,
    pub api_access: bool,
}

impl From<PlanCreate> for PlanCreateDBRequest {
    fn from(api: PlanCreate) -> Self {
        Self {
            name: api.name.trim().to_string(),
            price: api.price,
            monthly_credits: api.monthly_credits,
            client_count: api.client_count,
            channels_allowed: api.channels_allowed,
            automation_limit: api.automation_limit,
            campaign_limit: api.campaign_limit,
            api_access: api.api_access,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanUpdateDBRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub monthly_credits: Option<i64>,
    pub client_count: Option<i32>,
    pub channels_allowed: Option<Vec<Channel>>,
    pub automation_limit: Option<i32>,
    pub campaign_limit: Option<i32>,
    pub api_access: Option<bool>,
    pub status: Option<RecordStatus>,
}

impl From<PlanUpdate> for PlanUpdateDBRequest {
    fn from(api: PlanUpdate) -> Self {
        Self {
            name: api.name.map(|n| n.trim().to_string()),
            price: api.price,
            monthly_credits: api.monthly_credits,
            client_count: api.client_count,
            channels_allowed: api.channels_allowed,
            automation_limit: api.automation_limit,
            campaign_limit: api.campaign_limit,
            api_access: api.api_access,
            status: api.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanDBResponse {
    pub id: PlanId,
    pub name: String,
    pub price: Decimal,
    pub monthly_credits: i64,
    pub client_count: i32,
    pub channels_allowed: Vec<Channel>,
    pub automation_limit: i32,
    pub campaign_limit: i32,
    pub api_access: bool,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
