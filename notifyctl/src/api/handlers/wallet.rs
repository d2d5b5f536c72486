//! Credit ledger routes. Tenants read their own wallet; platform admins adjust any wallet.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use sqlx::PgConnection;

use crate::{
    AppState,
    api::models::{
        envelope::{Success, ok},
        pagination::Pagination,
        wallet::{WalletBalanceResponse, WalletTransactionCreate, WalletTransactionListResponse, WalletTransactionResponse},
    },
    api::validation::ValidatedJson,
    auth::permissions::{RequiresPermission, feature},
    db::{
        handlers::{Repository, Users, Wallet},
        models::wallet::WalletTransactionCreateDBRequest,
    },
    errors::{Error, Result},
    types::{UserId, abbrev_uuid},
};

async fn transaction_page(conn: &mut PgConnection, user_id: UserId, pagination: &Pagination) -> Result<WalletTransactionListResponse> {
    let (skip, limit) = pagination.params();
    let mut wallet = Wallet::new(conn);
    let total_count = wallet.summary(user_id).await?.transaction_count;
    let transactions = wallet.list_user_transactions(user_id, skip, limit).await?;

    Ok(WalletTransactionListResponse {
        transactions: transactions.into_iter().map(WalletTransactionResponse::from).collect(),
        total_count,
        skip,
        limit,
    })
}

/// Get the caller's balance
#[utoipa::path(
    get,
    path = "/wallet/balance",
    tag = "wallet",
    responses(
        (status = 200, description = "Balance derived from the ledger", body = WalletBalanceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Wallet access not granted"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_balance(
    State(state): State<AppState>,
    permission: RequiresPermission<feature::WalletView>,
) -> Result<Json<Success<WalletBalanceResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let summary = Wallet::new(&mut conn).summary(permission.user.id).await?;
    Ok(ok(WalletBalanceResponse::from(summary)))
}

/// List the caller's ledger, newest first
#[utoipa::path(
    get,
    path = "/wallet/transactions",
    tag = "wallet",
    params(Pagination),
    responses(
        (status = 200, description = "Ledger page", body = WalletTransactionListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Wallet access not granted"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    permission: RequiresPermission<feature::WalletView>,
) -> Result<Json<Success<WalletTransactionListResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Ok(ok(transaction_page(&mut conn, permission.user.id, &pagination).await?))
}

/// Append a credit or debit to a user's ledger
///
/// Debits that would leave the balance negative are rejected and write nothing.
#[utoipa::path(
    post,
    path = "/wallet/transactions",
    tag = "wallet",
    request_body = WalletTransactionCreate,
    responses(
        (status = 201, description = "Ledger entry", body = WalletTransactionResponse),
        (status = 400, description = "Invalid amount or insufficient balance"),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_transaction(
    State(state): State<AppState>,
    permission: RequiresPermission<feature::WalletAdjust>,
    ValidatedJson(request): ValidatedJson<WalletTransactionCreate>,
) -> Result<(StatusCode, Json<Success<WalletTransactionResponse>>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user_id = request.user_id;
    let transaction = Wallet::new(&mut conn)
        .append(&WalletTransactionCreateDBRequest {
            user_id,
            transaction_type: request.transaction_type,
            amount: request.amount,
            description: request.description,
        })
        .await
        .map_err(|e| match e {
            crate::db::errors::DbError::NotFound => Error::NotFound {
                resource: "User".to_string(),
                id: user_id.to_string(),
            },
            other => Error::Database(other),
        })?;

    tracing::info!(
        admin_id = %abbrev_uuid(&permission.user.id),
        user_id = %abbrev_uuid(&user_id),
        balance_after = %transaction.balance_after,
        "Wallet adjusted"
    );

    Ok((StatusCode::CREATED, ok(WalletTransactionResponse::from(transaction))))
}

/// List any user's ledger
#[utoipa::path(
    get,
    path = "/users/{id}/wallet/transactions",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User ID"), Pagination),
    responses(
        (status = 200, description = "Ledger page", body = WalletTransactionListResponse),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_user_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(pagination): Query<Pagination>,
    _: RequiresPermission<feature::WalletAdjust>,
) -> Result<Json<Success<WalletTransactionListResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if Users::new(&mut conn).get_by_id(user_id).await?.is_none() {
        return Err(Error::NotFound {
            resource: "User".to_string(),
            id: user_id.to_string(),
        });
    }
    Ok(ok(transaction_page(&mut conn, user_id, &pagination).await?))
}

#[cfg(test)]
mod tests {
    use crate::{api::models::users::Role, test_utils::*};
    use axum::http::StatusCode;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    fn decimal(value: &Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_adjustments_update_balance_and_ledger(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;
        let user = create_test_user(&pool, Role::User).await;

        let credit = server
            .post("/wallet/transactions")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "user_id": user.id, "type": "credit", "amount": 100, "description": "Top-up" }))
            .await;
        credit.assert_status(StatusCode::CREATED);
        let credit: Value = credit.json();
        assert_eq!(decimal(&credit["balance_after"]), Decimal::new(100, 0));
        assert_eq!(credit["status"], "completed");

        let debit: Value = server
            .post("/wallet/transactions")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "user_id": user.id, "type": "debit", "amount": "30.50" }))
            .await
            .json();
        assert_eq!(decimal(&debit["balance_after"]), Decimal::new(6950, 2));

        let balance: Value = server.get("/wallet/balance").add_header("authorization", bearer(&user)).await.json();
        assert_eq!(decimal(&balance["balance"]), Decimal::new(6950, 2));
        assert_eq!(decimal(&balance["credits_used"]), Decimal::new(3050, 2));
        assert_eq!(balance["transaction_count"], 2);

        let page: Value = server
            .get("/wallet/transactions?limit=1")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(page["total_count"], 2);
        assert_eq!(page["limit"], 1);
        assert_eq!(page["transactions"].as_array().unwrap().len(), 1);
        assert_eq!(page["transactions"][0]["type"], "debit");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_overdraft_is_rejected_without_writing(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;
        let user = create_test_user(&pool, Role::User).await;
        credit_user(&pool, user.id, Decimal::new(10, 0)).await;

        let response = server
            .post("/wallet/transactions")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "user_id": user.id, "type": "debit", "amount": 25 }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(response.json::<Value>()["message"].as_str().unwrap().contains("Insufficient balance"));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM wallet_transactions WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_adjustment_rules(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;
        let user = create_test_user(&pool, Role::User).await;

        server
            .post("/wallet/transactions")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "user_id": user.id, "type": "credit", "amount": 0 }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        let response = server
            .post("/wallet/transactions")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "user_id": user.id, "type": "credit", "amount": "1000000000000000" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["errors"][0]["field"], "amount");

        // Each credit fits, but the running balance would not
        credit_user(&pool, user.id, Decimal::new(99_999_999_999_999, 2)).await;
        let response = server
            .post("/wallet/transactions")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "user_id": user.id, "type": "credit", "amount": "0.01" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["field"], "amount");
        let balance: Value = server.get("/wallet/balance").add_header("authorization", bearer(&user)).await.json();
        assert_eq!(decimal(&balance["balance"]), Decimal::new(99_999_999_999_999, 2));
        assert_eq!(balance["transaction_count"], 1);
        server
            .post("/wallet/transactions")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "user_id": uuid::Uuid::new_v4(), "type": "credit", "amount": 5 }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .post("/wallet/transactions")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "user_id": user.id, "type": "credit", "amount": 5 }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_admin_reads_any_ledger(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;
        let user = create_test_user(&pool, Role::User).await;
        credit_user(&pool, user.id, Decimal::new(42, 0)).await;

        let page: Value = server
            .get(&format!("/users/{}/wallet/transactions", user.id))
            .add_header("authorization", bearer(&admin))
            .await
            .json();
        assert_eq!(page["total_count"], 1);
        assert_eq!(page["transactions"][0]["user_id"], user.id.to_string());

        server
            .get(&format!("/users/{}/wallet/transactions", uuid::Uuid::new_v4()))
            .add_header("authorization", bearer(&admin))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get(&format!("/users/{}/wallet/transactions", admin.id))
            .add_header("authorization", bearer(&user))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
