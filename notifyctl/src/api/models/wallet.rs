//! API request/response models for the wallet ledger.

use crate::api::validation::{Validate, Validator};
use crate::db::models::wallet::{
    MAX_BALANCE, WalletSummaryDBResponse, WalletTransactionDBResponse, WalletTransactionStatus, WalletTransactionType,
};
use crate::types::{UserId, WalletTransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Admin ledger adjustment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletTransactionCreate {
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub transaction_type: WalletTransactionType,
    /// Amount of credits, always positive
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub description: Option<String>,
}

impl Validate for WalletTransactionCreate {
    fn validate(&self, v: &mut Validator) {
        if self.amount > Decimal::ZERO {
            v.decimal("amount", self.amount, MAX_BALANCE, 2);
        } else {
            v.error("amount", "must be greater than 0");
        }
        v.optional_length("description", self.description.as_deref(), 0, 500);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletTransactionResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: WalletTransactionId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub transaction_type: WalletTransactionType,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub balance_after: Decimal,
    pub description: Option<String>,
    pub status: WalletTransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<WalletTransactionDBResponse> for WalletTransactionResponse {
    fn from(db: WalletTransactionDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            transaction_type: db.transaction_type,
            amount: db.amount,
            balance_after: db.balance_after,
            description: db.description,
            status: db.status,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletTransactionListResponse {
    pub transactions: Vec<WalletTransactionResponse>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletBalanceResponse {
    #[schema(value_type = String)]
    pub balance: Decimal,
    #[schema(value_type = String)]
    pub credits_used: Decimal,
    pub transaction_count: i64,
}

impl From<WalletSummaryDBResponse> for WalletBalanceResponse {
    fn from(db: WalletSummaryDBResponse) -> Self {
        Self {
            balance: db.balance,
            credits_used: db.credits_used,
            transaction_count: db.transaction_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::validation::validate;
    use serde_json::json;

    #[test]
    fn test_amount_must_be_positive() {
        for amount in [json!(0), json!(-5), json!("0.001")] {
            let create: WalletTransactionCreate = serde_json::from_value(json!({
                "user_id": uuid::Uuid::new_v4(),
                "type": "debit",
                "amount": amount
            }))
            .unwrap();
            assert!(validate(&create).is_err(), "{amount} should be rejected");
        }
    }

    #[test]
    fn test_accepts_string_and_number_amounts() {
        for amount in [json!(10), json!("10.50")] {
            let create: WalletTransactionCreate = serde_json::from_value(json!({
                "user_id": uuid::Uuid::new_v4(),
                "type": "credit",
                "amount": amount,
                "description": "top-up"
            }))
            .unwrap();
            assert_eq!(create.transaction_type, WalletTransactionType::Credit);
            assert!(validate(&create).is_ok());
        }
    }
}
