//! Test utilities for integration testing.

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role, TeamRole},
    auth::{
        password,
        permissions::{PermissionSet, TenantClass},
        session,
    },
    config::{Config, PoolSettings},
    db::{
        handlers::{Repository, Users, Wallet},
        models::{
            users::{UserCreateDBRequest, UserDBResponse},
            wallet::{WalletTransactionCreateDBRequest, WalletTransactionType},
        },
    },
    types::UserId,
};
use axum_test::TestServer;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn create_test_app(pool: PgPool) -> TestServer {
    create_test_app_with_config(pool, create_test_config()).await
}

pub async fn create_test_app_with_config(pool: PgPool, config: Config) -> TestServer {
    let app = crate::Application::new_with_pool(config, Some(pool))
        .await
        .expect("Failed to create application");
    app.into_test_server()
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_email: "admin@test.com".to_string(),
        admin_password: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        ..Default::default()
    };
    config.database.pool = PoolSettings {
        max_connections: 2,
        min_connections: 0,
        ..Default::default()
    };
    // Hashing cost is irrelevant under test
    config.auth.password.argon2_memory_kib = 128;
    config.auth.password.argon2_iterations = 1;
    config.auth.password.argon2_parallelism = 1;
    config
}

pub fn create_test_state(pool: PgPool) -> AppState {
    AppState::builder().db(pool).config(create_test_config()).build()
}

async fn insert_user(pool: &PgPool, role: Role, team_role: TeamRole, password_hash: Option<String>) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let id = Uuid::new_v4().simple().to_string();

    let request = UserCreateDBRequest {
        name: format!("Test User {}", &id[..8]),
        email: format!("testuser_{id}@example.com"),
        password_hash,
        role,
        team_role,
        permissions: PermissionSet::default_for(TenantClass::for_role(role)).to_entries(),
        plan_id: None,
        company: None,
        contact_phone: None,
        channels_enabled: Vec::new(),
    };

    Users::new(&mut conn).create(&request).await.expect("Failed to create test user")
}

pub async fn create_test_user(pool: &PgPool, role: Role) -> UserDBResponse {
    insert_user(pool, role, TeamRole::Admin, None).await
}

pub async fn create_test_admin_user(pool: &PgPool) -> UserDBResponse {
    insert_user(pool, Role::Admin, TeamRole::Admin, None).await
}

pub async fn create_test_user_with_team_role(pool: &PgPool, role: Role, team_role: TeamRole) -> UserDBResponse {
    insert_user(pool, role, team_role, None).await
}

/// A `Role::User` account that can log in with `password`.
pub async fn create_test_user_with_password(pool: &PgPool, password: &str) -> UserDBResponse {
    let hash = password::hash_password(password, create_test_config().auth.password.argon2_params()).expect("Failed to hash password");
    insert_user(pool, Role::User, TeamRole::Admin, Some(hash)).await
}

/// `Bearer <token>` for the given user, signed with the test secret.
pub fn bearer(user: &UserDBResponse) -> String {
    let current = CurrentUser {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    };
    let token = session::create_session_token(&current, &create_test_config()).expect("Failed to create session token");
    format!("Bearer {token}")
}

/// Append a credit to the user's ledger.
pub async fn credit_user(pool: &PgPool, user_id: UserId, amount: Decimal) {
    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    Wallet::new(&mut tx)
        .append(&WalletTransactionCreateDBRequest {
            user_id,
            transaction_type: WalletTransactionType::Credit,
            amount,
            description: Some("Test credit".to_string()),
        })
        .await
        .expect("Failed to credit user");
    tx.commit().await.expect("Failed to commit credit");
}
