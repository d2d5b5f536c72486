use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    api::{
        handlers::auth::check_password_length,
        models::{
            common::MessageResponse,
            envelope::{Success, ok},
            resellers::{ResellerCreate, ResellerCreatedResponse, ResellerListResponse, ResellerResponse, ResellerUpdate},
        },
        validation::ValidatedJson,
    },
    auth::{
        password,
        permissions::{PermissionSet, RequiresPermission, TenantClass, feature},
    },
    db::{
        handlers::{Repository, Resellers, resellers::ResellerFilter},
        models::{
            resellers::{ResellerCreateDBRequest, ResellerUpdateDBRequest},
            trim_text,
        },
    },
    errors::{Error, Result},
    types::{ResellerId, abbrev_uuid},
};

/// List resellers
#[utoipa::path(
    get,
    path = "/resellers",
    tag = "resellers",
    responses(
        (status = 200, description = "All resellers, newest first", body = ResellerListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Platform admins only"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_resellers(
    State(state): State<AppState>,
    _: RequiresPermission<feature::ResellersManage>,
) -> Result<Json<Success<ResellerListResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let resellers = Resellers::new(&mut conn).list(&ResellerFilter::default()).await?;
    Ok(ok(ResellerListResponse {
        resellers: resellers.into_iter().map(ResellerResponse::from).collect(),
    }))
}

/// Get a reseller
#[utoipa::path(
    get,
    path = "/resellers/{id}",
    tag = "resellers",
    params(("id" = uuid::Uuid, Path, description = "Reseller ID")),
    responses(
        (status = 200, description = "Reseller", body = ResellerResponse),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "Reseller not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_reseller(
    State(state): State<AppState>,
    Path(id): Path<ResellerId>,
    _: RequiresPermission<feature::ResellersManage>,
) -> Result<Json<Success<ResellerResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let reseller = Resellers::new(&mut conn).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
        resource: "Reseller".to_string(),
        id: id.to_string(),
    })?;
    Ok(ok(ResellerResponse::from(reseller)))
}

/// Create a reseller together with its login account
///
/// When no password is supplied a temporary one is generated and returned once in the response.
#[utoipa::path(
    post,
    path = "/resellers",
    tag = "resellers",
    request_body = ResellerCreate,
    responses(
        (status = 201, description = "Reseller created", body = ResellerCreatedResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Platform admins only"),
        (status = 409, description = "Email already in use"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_reseller(
    State(state): State<AppState>,
    _: RequiresPermission<feature::ResellersManage>,
    ValidatedJson(create): ValidatedJson<ResellerCreate>,
) -> Result<(StatusCode, Json<Success<ResellerCreatedResponse>>)> {
    let password_config = &state.config.auth.password;

    let (password, temporary_password) = match create.password {
        Some(password) => {
            check_password_length("password", &password, password_config)?;
            (password, None)
        }
        None => {
            let generated = password::generate_temporary_password();
            (generated.clone(), Some(generated))
        }
    };
    let password_hash = password::hash_password_blocking(password, password_config.argon2_params()).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let reseller = Resellers::new(&mut conn)
        .create(&ResellerCreateDBRequest {
            name: create.name.trim().to_string(),
            email: create.email,
            phone: trim_text(create.phone),
            domain: trim_text(create.domain),
            commission_percent: create.commission_percent.unwrap_or(Decimal::ZERO),
            plan_id: create.plan_id,
            channels_enabled: create.channels_enabled,
            password_hash,
            permissions: PermissionSet::default_for(TenantClass::Reseller).to_entries(),
        })
        .await?;

    tracing::info!(reseller_id = %abbrev_uuid(&reseller.id), generated_password = temporary_password.is_some(), "Reseller created");

    Ok((
        StatusCode::CREATED,
        ok(ResellerCreatedResponse {
            reseller: ResellerResponse::from(reseller),
            temporary_password,
        }),
    ))
}

/// Update a reseller (partial)
///
/// Name and email changes are mirrored onto the paired user account.
#[utoipa::path(
    put,
    path = "/resellers/{id}",
    tag = "resellers",
    request_body = ResellerUpdate,
    params(("id" = uuid::Uuid, Path, description = "Reseller ID")),
    responses(
        (status = 200, description = "Reseller updated", body = MessageResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "Reseller not found"),
        (status = 409, description = "Email already in use"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_reseller(
    State(state): State<AppState>,
    Path(id): Path<ResellerId>,
    _: RequiresPermission<feature::ResellersManage>,
    ValidatedJson(update): ValidatedJson<ResellerUpdate>,
) -> Result<Json<Success<MessageResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    Resellers::new(&mut conn).update(id, &ResellerUpdateDBRequest::from(update)).await?;
    Ok(ok(MessageResponse::new("Reseller updated successfully")))
}

#[cfg(test)]
mod tests {
    use crate::{api::models::users::Role, test_utils::*};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_returns_temporary_password_that_logs_in(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;

        let response = server
            .post("/resellers")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "name": "Acme Resale", "email": "Partner@Acme.example", "commission_percent": 12.5 }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        assert_eq!(body["email"], "partner@acme.example");
        assert_eq!(body["status"], "active");
        let temporary = body["temporary_password"].as_str().unwrap().to_string();

        let login = server
            .post("/login")
            .json(&json!({ "email": "partner@acme.example", "password": temporary }))
            .await;
        login.assert_status_ok();
        let login: Value = login.json();
        assert_eq!(login["user"]["role"], "reseller");
        assert_eq!(login["user"]["id"], body["user_id"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_supplied_password_is_not_echoed(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;

        let body: Value = server
            .post("/resellers")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "name": "Acme Resale", "email": "partner@acme.example", "password": "chosen-password" }))
            .await
            .json();
        assert!(body.get("temporary_password").is_none());

        server
            .post("/login")
            .json(&json!({ "email": "partner@acme.example", "password": "chosen-password" }))
            .await
            .assert_status_ok();
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_conflicts_with_users_too(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;
        let existing = create_test_user(&pool, Role::User).await;

        let response = server
            .post("/resellers")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "name": "Copy", "email": existing.email }))
            .await;
        response.assert_status(StatusCode::CONFLICT);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resellers").fetch_one(&pool).await.unwrap();
        assert_eq!(count, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_status_only_update(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;

        let created: Value = server
            .post("/resellers")
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "name": "Acme Resale", "email": "partner@acme.example", "domain": "acme.example" }))
            .await
            .json();
        let id = created["id"].as_str().unwrap();

        let response = server
            .put(&format!("/resellers/{id}"))
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "status": "inactive" }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert!(body["message"].is_string());

        let fetched: Value = server
            .get(&format!("/resellers/{id}"))
            .add_header("authorization", bearer(&admin))
            .await
            .json();
        assert_eq!(fetched["status"], "inactive");
        assert_eq!(fetched["name"], "Acme Resale");
        assert_eq!(fetched["domain"], "acme.example");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_free_text_is_trimmed_and_nullable_fields_clear(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;

        let created: Value = server
            .post("/resellers")
            .add_header("authorization", bearer(&admin))
            .json(&json!({
                "name": "Acme Resale",
                "email": "partner@acme.example",
                "phone": format!("12345{}", " ".repeat(40)),
                "domain": "  acme.example  "
            }))
            .await
            .json();
        assert_eq!(created["phone"], "12345");
        assert_eq!(created["domain"], "acme.example");
        let id = created["id"].as_str().unwrap();

        server
            .put(&format!("/resellers/{id}"))
            .add_header("authorization", bearer(&admin))
            .json(&json!({ "domain": null }))
            .await
            .assert_status_ok();

        let fetched: Value = server
            .get(&format!("/resellers/{id}"))
            .add_header("authorization", bearer(&admin))
            .await
            .json();
        assert!(fetched["domain"].is_null());
        assert_eq!(fetched["phone"], "12345");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_tenants_cannot_manage_resellers(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;
        let reseller_account = create_test_user(&pool, Role::Reseller).await;

        for caller in [&user, &reseller_account] {
            server
                .get("/resellers")
                .add_header("authorization", bearer(caller))
                .await
                .assert_status(StatusCode::FORBIDDEN);
        }
        server
            .get(&format!("/resellers/{}", uuid::Uuid::new_v4()))
            .add_header("authorization", bearer(&create_test_admin_user(&pool).await))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
