//! Database repository for the append-only wallet ledger.
//!
//! Balances are never stored; they are the sum of credits minus the sum of debits. Appends lock
//! the owning user row so concurrent debits against one wallet serialize.

use crate::types::{UserId, abbrev_uuid};
use crate::db::{
    errors::{DbError, Result},
    models::wallet::{
        MAX_BALANCE, WalletSummaryDBResponse, WalletTransactionCreateDBRequest, WalletTransactionDBResponse, WalletTransactionStatus,
        WalletTransactionType,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
struct WalletTransaction {
    pub id: Uuid,
    pub user_id: UserId,
    pub transaction_type: WalletTransactionType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub description: Option<String>,
    pub status: WalletTransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<WalletTransaction> for WalletTransactionDBResponse {
    fn from(tx: WalletTransaction) -> Self {
        Self {
            id: tx.id,
            user_id: tx.user_id,
            transaction_type: tx.transaction_type,
            amount: tx.amount,
            balance_after: tx.balance_after,
            description: tx.description,
            status: tx.status,
            created_at: tx.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct Summary {
    balance: Decimal,
    credits_used: Decimal,
    transaction_count: i64,
}

pub struct Wallet<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Wallet<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Append a ledger entry, computing `balance_after` under a lock on the user row.
    ///
    /// Debits that would take the balance below zero fail with `InsufficientBalance` and write
    /// nothing, as do credits that would reach [`MAX_BALANCE`]. An unknown user is `NotFound`.
    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), kind = ?request.transaction_type, amount = %request.amount), err)]
    pub async fn append(&mut self, request: &WalletTransactionCreateDBRequest) -> Result<WalletTransactionDBResponse> {
        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, UserId>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(request.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        let balance = Self::summary_internal(&mut tx, request.user_id).await?.balance;
        let balance_after = match request.transaction_type {
            WalletTransactionType::Credit => balance + request.amount,
            WalletTransactionType::Debit => balance - request.amount,
        };
        if balance_after < Decimal::ZERO {
            return Err(DbError::InsufficientBalance {
                balance,
                requested: request.amount,
            });
        }
        if balance_after >= MAX_BALANCE {
            return Err(DbError::BalanceLimitExceeded {
                balance,
                requested: request.amount,
                limit: MAX_BALANCE,
            });
        }

        let transaction = sqlx::query_as::<_, WalletTransaction>(
            r#"
            INSERT INTO wallet_transactions (id, user_id, transaction_type, amount, balance_after, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.transaction_type)
        .bind(request.amount)
        .bind(balance_after)
        .bind(&request.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(WalletTransactionDBResponse::from(transaction))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn summary(&mut self, user_id: UserId) -> Result<WalletSummaryDBResponse> {
        Self::summary_internal(&mut *self.db, user_id).await
    }

    async fn summary_internal(conn: &mut PgConnection, user_id: UserId) -> Result<WalletSummaryDBResponse> {
        let summary = sqlx::query_as::<_, Summary>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN transaction_type = 'credit' THEN amount ELSE -amount END), 0) AS balance,
                COALESCE(SUM(amount) FILTER (WHERE transaction_type = 'debit'), 0) AS credits_used,
                COUNT(*) AS transaction_count
            FROM wallet_transactions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(conn)
        .await?;

        Ok(WalletSummaryDBResponse {
            balance: summary.balance,
            credits_used: summary.credits_used,
            transaction_count: summary.transaction_count,
        })
    }

    /// Newest first.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn list_user_transactions(&mut self, user_id: UserId, skip: i64, limit: i64) -> Result<Vec<WalletTransactionDBResponse>> {
        let transactions = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT * FROM wallet_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(transactions.into_iter().map(WalletTransactionDBResponse::from).collect())
    }
}
