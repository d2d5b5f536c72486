//! API request/response models for subscription plans.

use super::common::{Channel, RecordStatus};
use crate::api::validation::{Validate, Validator};
use crate::db::models::plans::PlanDBResponse;
use crate::types::PlanId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// `automation_limit` / `campaign_limit` value meaning "no limit".
pub const UNLIMITED: i32 = -1;

/// Prices are stored as `NUMERIC(12, 2)`.
pub const MAX_PRICE: Decimal = Decimal::from_parts(0x540B_E400, 0x2, 0, false, 0); // 10_000_000_000

fn unlimited() -> i32 {
    UNLIMITED
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanCreate {
    pub name: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub monthly_credits: i64,
    pub client_count: i32,
    pub channels_allowed: Vec<Channel>,
    #[serde(default = "unlimited")]
    pub automation_limit: i32,
    #[serde(default = "unlimited")]
    pub campaign_limit: i32,
    #[serde(default)]
    pub api_access: bool,
}

impl Validate for PlanCreate {
    fn validate(&self, v: &mut Validator) {
        v.length("name", &self.name, 2, 100)
            .decimal("price", self.price, MAX_PRICE, 2)
            .min("monthly_credits", self.monthly_credits, 0)
            .min("client_count", self.client_count, 0)
            .non_empty_unique("channels_allowed", &self.channels_allowed)
            .min("automation_limit", self.automation_limit, UNLIMITED)
            .min("campaign_limit", self.campaign_limit, UNLIMITED);
    }
}

/// Partial plan update. Only supplied fields are validated and written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PlanUpdate {
    pub name: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub monthly_credits: Option<i64>,
    pub client_count: Option<i32>,
    pub channels_allowed: Option<Vec<Channel>>,
    pub automation_limit: Option<i32>,
    pub campaign_limit: Option<i32>,
    pub api_access: Option<bool>,
    pub status: Option<RecordStatus>,
}

impl Validate for PlanUpdate {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("name", self.name.as_deref(), 2, 100)
            .optional_decimal("price", self.price, MAX_PRICE, 2)
            .optional_min("monthly_credits", self.monthly_credits, 0)
            .optional_min("client_count", self.client_count, 0)
            .optional_min("automation_limit", self.automation_limit, UNLIMITED)
            .optional_min("campaign_limit", self.campaign_limit, UNLIMITED);
        if let Some(channels) = &self.channels_allowed {
            v.non_empty_unique("channels_allowed", channels);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: PlanId,
    pub name: String,
    #[schema(value_type = String)]
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

impl From<PlanDBResponse> for PlanResponse {
    fn from(db: PlanDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            price: db.price,
            monthly_credits: db.monthly_credits,
            client_count: db.client_count,
            channels_allowed: db.channels_allowed,
            automation_limit: db.automation_limit,
            campaign_limit: db.campaign_limit,
            api_access: db.api_access,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanListResponse {
    pub plans: Vec<PlanResponse>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListPlansQuery {
    /// Include inactive plans (platform admins only)
    #[serde(default)]
    pub all: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::validation::validate;
    use crate::errors::Error;
    use serde_json::json;

    fn fields(err: Error) -> Vec<String> {
        match err {
            Error::Validation { errors } => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_limits_default_to_unlimited() {
        let plan: PlanCreate = serde_json::from_value(json!({
            "name": "Starter",
            "price": 0,
            "monthly_credits": 100,
            "client_count": 1,
            "channels_allowed": ["sms"]
        }))
        .unwrap();
        assert_eq!(plan.automation_limit, UNLIMITED);
        assert_eq!(plan.campaign_limit, UNLIMITED);
        assert!(!plan.api_access);
        assert!(validate(&plan).is_ok());
    }

    #[test]
    fn test_create_rules() {
        let plan: PlanCreate = serde_json::from_value(json!({
            "name": " P ",
            "price": -1,
            "monthly_credits": -5,
            "client_count": -1,
            "channels_allowed": [],
            "automation_limit": -2,
            "campaign_limit": -1
        }))
        .unwrap();
        assert_eq!(
            fields(validate(&plan).unwrap_err()),
            vec!["name", "price", "monthly_credits", "client_count", "channels_allowed", "automation_limit"]
        );
    }

    #[test]
    fn test_price_must_fit_two_decimal_places_below_max() {
        let mut plan: PlanCreate = serde_json::from_value(json!({
            "name": "Pro",
            "price": "100000000000",
            "monthly_credits": 1,
            "client_count": 1,
            "channels_allowed": ["sms"]
        }))
        .unwrap();
        assert_eq!(fields(validate(&plan).unwrap_err()), vec!["price"]);

        plan.price = MAX_PRICE;
        assert_eq!(fields(validate(&plan).unwrap_err()), vec!["price"]);

        plan.price = Decimal::new(299_999, 3);
        assert_eq!(fields(validate(&plan).unwrap_err()), vec!["price"]);

        plan.price = Decimal::new(299_990, 3);
        assert!(validate(&plan).is_ok());

        let update = PlanUpdate {
            price: Some(Decimal::new(1, 3)),
            ..Default::default()
        };
        assert_eq!(fields(validate(&update).unwrap_err()), vec!["price"]);
    }

    #[test]
    fn test_unknown_channel_is_rejected_at_parse() {
        let result = serde_json::from_value::<PlanCreate>(json!({
            "name": "Pro",
            "price": 10,
            "monthly_credits": 1,
            "client_count": 1,
            "channels_allowed": ["sms", "pager"]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_update_only_checks_supplied_fields() {
        let update = PlanUpdate {
            channels_allowed: Some(vec![Channel::Sms, Channel::Sms]),
            ..Default::default()
        };
        assert_eq!(fields(validate(&update).unwrap_err()), vec!["channels_allowed"]);
        assert!(validate(&PlanUpdate::default()).is_ok());
    }
}
