//! API request/response models for resellers.

use super::common::{Channel, RecordStatus};
use crate::api::validation::{Validate, Validator};
use crate::db::models::resellers::ResellerDBResponse;
use crate::types::{PlanId, ResellerId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const MAX_COMMISSION: Decimal = Decimal::ONE_HUNDRED;

fn check_commission(v: &mut Validator, commission: Decimal) {
    v.check(
        (Decimal::ZERO..=MAX_COMMISSION).contains(&commission),
        "commission_percent",
        "must be between 0 and 100",
    )
    .check(
        commission.normalize().scale() <= 2,
        "commission_percent",
        "must have at most 2 decimal places",
    );
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResellerCreate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub domain: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub commission_percent: Option<Decimal>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub plan_id: Option<PlanId>,
    #[serde(default)]
    pub channels_enabled: Vec<Channel>,
    /// Login password for the paired account. A temporary one is generated when omitted.
    pub password: Option<String>,
}

impl Validate for ResellerCreate {
    fn validate(&self, v: &mut Validator) {
        v.length("name", &self.name, 2, 100)
            .email("email", &self.email)
            .optional_length("phone", self.phone.as_deref(), 0, 32)
            .optional_length("domain", self.domain.as_deref(), 0, 255)
            .unique("channels_enabled", &self.channels_enabled);
        if let Some(commission) = self.commission_percent {
            check_commission(v, commission);
        }
    }
}

/// Partial reseller update. Email and name changes are mirrored onto the paired user.
///
/// `phone`, `domain` and `plan_id` accept `null` to clear the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ResellerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub domain: Option<Option<String>>,
    #[schema(value_type = Option<f64>)]
    pub commission_percent: Option<Decimal>,
    pub status: Option<RecordStatus>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub plan_id: Option<Option<PlanId>>,
    pub channels_enabled: Option<Vec<Channel>>,
}

impl Validate for ResellerUpdate {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("name", self.name.as_deref(), 2, 100)
            .patch_length("phone", &self.phone, 0, 32)
            .patch_length("domain", &self.domain, 0, 255);
        if let Some(email) = &self.email {
            v.email("email", email);
        }
        if let Some(commission) = self.commission_percent {
            check_commission(v, commission);
        }
        if let Some(channels) = &self.channels_enabled {
            v.unique("channels_enabled", channels);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResellerResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: ResellerId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub domain: Option<String>,
    #[schema(value_type = String)]
    pub commission_percent: Decimal,
    pub status: RecordStatus,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub plan_id: Option<PlanId>,
    pub channels_enabled: Vec<Channel>,
    #[schema(value_type = String)]
    pub payout_pending: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ResellerDBResponse> for ResellerResponse {
    fn from(db: ResellerDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            email: db.email,
            phone: db.phone,
            domain: db.domain,
            commission_percent: db.commission_percent,
            status: db.status,
            plan_id: db.plan_id,
            channels_enabled: db.channels_enabled,
            payout_pending: db.payout_pending,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Returned once on creation. `temporary_password` is only present when it was generated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResellerCreatedResponse {
    #[serde(flatten)]
    pub reseller: ResellerResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResellerListResponse {
    pub resellers: Vec<ResellerResponse>,
}
