//! Database models for the wallet ledger.

use crate::types::{UserId, WalletTransactionId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Exclusive bound on ledger amounts and running balances (`NUMERIC(14, 2)` columns).
pub const MAX_BALANCE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0); // 1_000_000_000_000

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "wallet_transaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WalletTransactionType {
    Credit,
    Debit,
}

/// Ledger entries are terminal as soon as they are written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "wallet_transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WalletTransactionStatus {
    Completed,
}

#[derive(Debug, Clone)]
pub struct WalletTransactionCreateDBRequest {
    pub user_id: UserId,
    pub transaction_type: WalletTransactionType,
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WalletTransactionDBResponse {
    pub id: WalletTransactionId,
    pub user_id: UserId,
    pub transaction_type: WalletTransactionType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub description: Option<String>,
    pub status: WalletTransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// Balance figures derived from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSummaryDBResponse {
    pub balance: Decimal,
    pub credits_used: Decimal,
    pub transaction_count: i64,
}
