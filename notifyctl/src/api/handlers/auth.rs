use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;

use crate::{
    AppState,
    api::{
        models::{
            envelope::{Success, ok},
            users::{AuthResponse, CurrentUser, LoginRequest, Role, SignupRequest, TeamRole, UserResponse},
        },
        validation::ValidatedJson,
    },
    auth::{
        password,
        permissions::{PermissionSet, TenantClass},
        session,
    },
    config::PasswordConfig,
    db::{
        handlers::{Repository, Users, Wallet},
        models::{
            trim_text,
            users::{UserCreateDBRequest, UserDBResponse},
            wallet::{WalletTransactionCreateDBRequest, WalletTransactionType},
        },
    },
    errors::{Error, FieldError, Result},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some(INVALID_CREDENTIALS.to_string()),
    }
}

/// Reject passwords outside the configured length bounds (counted in characters).
pub(crate) fn check_password_length(field: &str, password: &str, config: &PasswordConfig) -> Result<()> {
    let len = password.chars().count();
    if len < config.min_length || len > config.max_length {
        return Err(Error::Validation {
            errors: vec![FieldError::new(
                field,
                format!("must be between {} and {} characters", config.min_length, config.max_length),
            )],
        });
    }
    Ok(())
}

fn auth_response(user: UserDBResponse, state: &AppState) -> Result<AuthResponse> {
    let token = session::create_session_token(&CurrentUser::from(&user), &state.config)?;
    Ok(AuthResponse {
        token,
        user: UserResponse::from(user),
    })
}

/// Exchange email and password for a session token
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    tag = "authentication",
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing fields"),
        (status = 401, description = "Invalid email or password"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, ValidatedJson(request): ValidatedJson<LoginRequest>) -> Result<Json<Success<AuthResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut users = Users::new(&mut conn);

    let user = users.get_user_by_email(&request.email).await?.ok_or_else(invalid_credentials)?;
    let hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;

    if !password::verify_password_blocking(request.password, hash).await? {
        return Err(invalid_credentials());
    }

    users.touch_last_login(user.id).await?;
    tracing::info!(user_id = %crate::types::abbrev_uuid(&user.id), "User logged in");

    Ok(ok(auth_response(user, &state)?))
}

/// Register a tenant account
///
/// New accounts get role `user`, team role `admin` and the default user-catalog permissions.
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    tag = "authentication",
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<Success<AuthResponse>>)> {
    let password_config = &state.config.auth.password;
    check_password_length("password", &request.password, password_config)?;

    let password_hash = password::hash_password_blocking(request.password, password_config.argon2_params()).await?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut tx)
        .create(&UserCreateDBRequest {
            name: request.name.trim().to_string(),
            email: request.email,
            password_hash: Some(password_hash),
            role: Role::User,
            team_role: TeamRole::Admin,
            permissions: PermissionSet::default_for(TenantClass::User).to_entries(),
            plan_id: None,
            company: trim_text(request.company),
            contact_phone: trim_text(request.contact_phone),
            channels_enabled: Vec::new(),
        })
        .await?;

    let initial_credits = state.config.credits.initial_credits;
    if initial_credits > Decimal::ZERO {
        Wallet::new(&mut tx)
            .append(&WalletTransactionCreateDBRequest {
                user_id: user.id,
                transaction_type: WalletTransactionType::Credit,
                amount: initial_credits,
                description: Some("Initial credits on account creation".to_string()),
            })
            .await?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, ok(auth_response(user, &state)?)))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::users::Role,
        auth::session::verify_session_token,
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_returns_token_with_identity_claims(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user_with_password(&pool, "correct-horse-battery").await;

        let response = server
            .post("/login")
            .json(&json!({ "email": user.email.to_uppercase(), "password": "correct-horse-battery" }))
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["email"], user.email);
        assert!(body["user"].get("password_hash").is_none());

        let claims = verify_session_token(body["token"].as_str().unwrap(), &create_test_config()).unwrap();
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, Role::User);

        let last_login: Option<chrono::DateTime<chrono::Utc>> = sqlx::query_scalar("SELECT last_login FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(last_login.is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_failures_share_one_message(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user_with_password(&pool, "correct-horse-battery").await;
        let passwordless = create_test_user(&pool, Role::User).await;

        let wrong_password = server
            .post("/login")
            .json(&json!({ "email": user.email, "password": "wrong-password" }))
            .await;
        let unknown_user = server
            .post("/login")
            .json(&json!({ "email": "nobody@example.com", "password": "whatever-password" }))
            .await;
        let no_password = server
            .post("/login")
            .json(&json!({ "email": passwordless.email, "password": "whatever-password" }))
            .await;

        for response in [wrong_password, unknown_user, no_password] {
            response.assert_status(StatusCode::UNAUTHORIZED);
            let body: serde_json::Value = response.json();
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Invalid email or password");
            assert!(body.get("token").is_none());
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_login_missing_fields_is_bad_request(pool: PgPool) {
        let server = create_test_app(pool).await;
        server
            .post("/login")
            .json(&json!({ "email": "a@example.com" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        server
            .post("/login")
            .json(&json!({ "email": "a@example.com", "password": "" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_signup_creates_tenant_admin(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;

        let response = server
            .post("/signup")
            .json(&json!({
                "name": "Ada Lovelace",
                "email": "Ada@Example.com",
                "password": "analytical-engine",
                "company": "Engines Ltd",
                "contact_phone": format!("12345{}", " ".repeat(40))
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: serde_json::Value = response.json();
        assert_eq!(body["user"]["email"], "ada@example.com");
        assert_eq!(body["user"]["contact_phone"], "12345");
        assert_eq!(body["user"]["role"], "user");
        assert_eq!(body["user"]["team_role"], "admin");
        assert!(!body["user"]["permissions"].as_array().unwrap().is_empty());
        assert!(body["token"].is_string());

        let login = server
            .post("/login")
            .json(&json!({ "email": "ada@example.com", "password": "analytical-engine" }))
            .await;
        login.assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_signup_rejects_duplicates_and_short_passwords(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let existing = create_test_user(&pool, Role::User).await;

        let duplicate = server
            .post("/signup")
            .json(&json!({ "name": "Copy Cat", "email": existing.email, "password": "long-enough-password" }))
            .await;
        duplicate.assert_status(StatusCode::CONFLICT);

        let short = server
            .post("/signup")
            .json(&json!({ "name": "Shorty", "email": "short@example.com", "password": "abc" }))
            .await;
        short.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = short.json();
        assert_eq!(body["errors"][0]["field"], "password");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_signup_grants_configured_initial_credits(pool: PgPool) {
        let mut config = create_test_config();
        config.credits.initial_credits = rust_decimal::Decimal::new(5000, 2);
        let server = create_test_app_with_config(pool.clone(), config).await;

        let response = server
            .post("/signup")
            .json(&json!({ "name": "Grace", "email": "grace@example.com", "password": "compiler-pioneer" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let token = response.json::<serde_json::Value>()["token"].as_str().unwrap().to_string();

        let balance = server
            .get("/wallet/balance")
            .add_header("authorization", format!("Bearer {token}"))
            .await;
        balance.assert_status_ok();
        let body: serde_json::Value = balance.json();
        assert_eq!(body["transaction_count"], 1);
        let balance: rust_decimal::Decimal = body["balance"].as_str().unwrap().parse().unwrap();
        assert_eq!(balance, rust_decimal::Decimal::new(50, 0));
    }
}
