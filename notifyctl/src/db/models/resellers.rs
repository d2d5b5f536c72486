//! Database models for resellers.

use super::trim_patch;
use crate::api::models::common::{Channel, RecordStatus};
use crate::api::models::resellers::ResellerUpdate;
use crate::auth::permissions::PermissionEntry;
use crate::types::{PlanId, ResellerId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Creates the reseller row and its paired `reseller` user together.
#[derive(Debug, Clone)]
pub struct ResellerCreateDBRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub domain: Option<String>,
    pub commission_percent: Decimal,
    pub plan_id: Option<PlanId>,
    pub channels_enabled: Vec<Channel>,
    /// Hash for the paired user's password
    pub password_hash: String,
    /// Initial permission array for the paired user
    pub permissions: Vec<PermissionEntry>,
}

/// `None` leaves a column unchanged; `Some(None)` clears a nullable one.
#[derive(Debug, Clone, Default)]
pub struct ResellerUpdateDBRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub domain: Option<Option<String>>,
    pub commission_percent: Option<Decimal>,
    pub status: Option<RecordStatus>,
    pub plan_id: Option<Option<PlanId>>,
    pub channels_enabled: Option<Vec<Channel>>,
}

impl From<ResellerUpdate> for ResellerUpdateDBRequest {
    fn from(api: ResellerUpdate) -> Self {
        Self {
            name: api.name.map(|n| n.trim().to_string()),
            email: api.email.map(|e| e.trim().to_lowercase()),
            phone: trim_patch(api.phone),
            domain: trim_patch(api.domain),
            commission_percent: api.commission_percent,
            status: api.status,
            plan_id: api.plan_id,
            channels_enabled: api.channels_enabled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResellerDBResponse {
    pub id: ResellerId,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub domain: Option<String>,
    pub commission_percent: Decimal,
    pub status: RecordStatus,
    pub plan_id: Option<PlanId>,
    pub channels_enabled: Vec<Channel>,
    pub payout_pending: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
