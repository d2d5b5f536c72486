//! The caller's own account: view, edit, change password.

use axum::{Json, extract::State};

use crate::{
    AppState,
    api::{
        handlers::auth::check_password_length,
        models::{
            common::MessageResponse,
            envelope::{Success, ok},
            users::{ChangePasswordRequest, CurrentUser, ProfileResponse, ProfileUpdate, UserResponse},
        },
        validation::ValidatedJson,
    },
    auth::password,
    db::{
        handlers::{Repository, Users, Wallet},
        models::users::{UserDBResponse, UserUpdateDBRequest},
    },
    errors::{Error, Result},
};
use sqlx::PgConnection;

/// A valid token for a user that no longer exists is treated like an invalid token.
async fn load_self(conn: &mut PgConnection, current: &CurrentUser) -> Result<UserDBResponse> {
    Users::new(conn).get_by_id(current.id).await?.ok_or_else(|| Error::Unauthenticated {
        message: Some("Invalid or expired token".to_string()),
    })
}

async fn profile_response(conn: &mut PgConnection, user: UserDBResponse) -> Result<ProfileResponse> {
    let summary = Wallet::new(conn).summary(user.id).await?;
    Ok(ProfileResponse {
        user: UserResponse::from(user),
        credits_available: summary.balance,
        credits_used: summary.credits_used,
    })
}

/// Get the caller's profile with wallet figures
#[utoipa::path(
    get,
    path = "/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Current user's profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_profile(State(state): State<AppState>, current: CurrentUser) -> Result<Json<Success<ProfileResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = load_self(&mut conn, &current).await?;
    Ok(ok(profile_response(&mut conn, user).await?))
}

/// Update the caller's name, company, contact phone or channels
#[utoipa::path(
    put,
    path = "/profile",
    request_body = ProfileUpdate,
    tag = "profile",
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(update): ValidatedJson<ProfileUpdate>,
) -> Result<Json<Success<ProfileResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    load_self(&mut conn, &current).await?;

    let user = Users::new(&mut conn).update(current.id, &UserUpdateDBRequest::from(update)).await?;
    Ok(ok(profile_response(&mut conn, user).await?))
}

/// Change the caller's password
#[utoipa::path(
    put,
    path = "/profile/change-password",
    request_body = ChangePasswordRequest,
    tag = "profile",
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "New password violates length bounds"),
        (status = 401, description = "Current password is wrong"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    ValidatedJson(request): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<Success<MessageResponse>>> {
    let password_config = &state.config.auth.password;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = load_self(&mut conn, &current).await?;

    let wrong_password = || Error::Unauthenticated {
        message: Some("Current password is incorrect".to_string()),
    };
    let hash = user.password_hash.ok_or_else(wrong_password)?;
    if !password::verify_password_blocking(request.current_password, hash).await? {
        return Err(wrong_password());
    }

    check_password_length("new_password", &request.new_password, password_config)?;
    let new_hash = password::hash_password_blocking(request.new_password, password_config.argon2_params()).await?;
    Users::new(&mut conn).set_password_hash(user.id, &new_hash).await?;

    Ok(ok(MessageResponse::new("Password updated successfully")))
}

#[cfg(test)]
mod tests {
    use crate::{api::models::users::Role, test_utils::*};
    use axum::http::StatusCode;
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_profile_includes_wallet_figures_and_no_hash(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user_with_password(&pool, "correct-horse-battery").await;
        credit_user(&pool, user.id, rust_decimal::Decimal::new(120, 0)).await;

        let response = server.get("/profile").add_header("authorization", bearer(&user)).await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["id"], user.id.to_string());
        assert!(body.get("password_hash").is_none());
        let available: rust_decimal::Decimal = body["credits_available"].as_str().unwrap().parse().unwrap();
        assert_eq!(available, rust_decimal::Decimal::new(120, 0));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_profile_requires_token(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server.get("/profile").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<serde_json::Value>()["message"], "No token provided");

        let response = server.get("/profile").add_header("authorization", "Bearer nonsense").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<serde_json::Value>()["message"], "Invalid or expired token");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_partial_profile_update(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let response = server
            .put("/profile")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "company": "Acme", "channels_enabled": ["sms", "rcs"] }))
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["company"], "Acme");
        assert_eq!(body["name"], user.name);
        assert_eq!(body["channels_enabled"], json!(["sms", "rcs"]));

        let body: serde_json::Value = server
            .put("/profile")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "company": null, "contact_phone": "+1 555 0100   " }))
            .await
            .json();
        assert!(body["company"].is_null());
        assert_eq!(body["contact_phone"], "+1 555 0100");
        assert_eq!(body["channels_enabled"], json!(["sms", "rcs"]));

        server
            .put("/profile")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "channels_enabled": ["sms", "fax"] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_change_password(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user_with_password(&pool, "correct-horse-battery").await;

        server
            .put("/profile/change-password")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "current_password": "wrong-guess-here", "new_password": "brand-new-secret" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        server
            .put("/profile/change-password")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "current_password": "correct-horse-battery", "new_password": "short" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .put("/profile/change-password")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "current_password": "correct-horse-battery", "new_password": "brand-new-secret" }))
            .await
            .assert_status_ok();

        server
            .post("/login")
            .json(&json!({ "email": user.email, "password": "brand-new-secret" }))
            .await
            .assert_status_ok();
        server
            .post("/login")
            .json(&json!({ "email": user.email, "password": "correct-horse-battery" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
