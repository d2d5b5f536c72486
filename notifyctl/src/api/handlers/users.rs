use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::{
    AppState,
    api::{
        models::{
            envelope::{Success, ok},
            users::{
                ListUsersQuery, PermissionCatalog, PermissionCatalogResponse, PermissionsUpdate, UserListResponse, UserResponse,
            },
        },
        validation::ValidatedJson,
    },
    auth::permissions::{PermissionSet, RequiresPermission, TenantClass, feature},
    db::handlers::{Repository, Users, users::UserFilter},
    errors::{Error, Result},
    types::{UserId, abbrev_uuid},
};

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// List users
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users, newest first", body = UserListResponse),
        (status = 403, description = "Platform admins only"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    _: RequiresPermission<feature::UsersManage>,
) -> Result<Json<Success<UserListResponse>>> {
    let (skip, limit) = query.pagination.params();
    let mut filter = UserFilter::new(skip, limit);
    if let Some(role) = query.role {
        filter = filter.with_role(role);
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);
    let users = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(ok(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        total_count,
        skip,
        limit,
    }))
}

/// Get a user
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    _: RequiresPermission<feature::UsersManage>,
) -> Result<Json<Success<UserResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let user = Users::new(&mut conn).get_by_id(id).await?.ok_or_else(|| user_not_found(id))?;
    Ok(ok(UserResponse::from(user)))
}

/// Replace a user's team role and permissions
///
/// Entries must name features from the catalog of the user's tenant class, each at most once.
#[utoipa::path(
    put,
    path = "/users/{id}/permissions",
    tag = "users",
    request_body = PermissionsUpdate,
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Unknown, foreign or duplicate feature"),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "User not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_permissions(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    permission: RequiresPermission<feature::UsersManage>,
    ValidatedJson(update): ValidatedJson<PermissionsUpdate>,
) -> Result<Json<Success<UserResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut conn);

    let target = repo.get_by_id(id).await?.ok_or_else(|| user_not_found(id))?;
    let permissions = PermissionSet::try_from_request(TenantClass::for_role(target.role), &update.permissions)
        .map_err(|errors| Error::Validation { errors })?;

    let user = repo.set_permissions(id, update.team_role, &permissions.to_entries()).await?;
    tracing::info!(
        admin_id = %abbrev_uuid(&permission.user.id),
        user_id = %abbrev_uuid(&id),
        "Permissions replaced"
    );

    Ok(ok(UserResponse::from(user)))
}

/// The feature catalogs for user and reseller tenants
#[utoipa::path(
    get,
    path = "/permissions/catalog",
    tag = "users",
    responses(
        (status = 200, description = "Both tenant catalogs", body = PermissionCatalogResponse),
    )
)]
pub async fn permissions_catalog() -> Json<Success<PermissionCatalogResponse>> {
    let catalogs = [TenantClass::User, TenantClass::Reseller]
        .into_iter()
        .map(|class| PermissionCatalog {
            tenant_class: class,
            features: class.catalog().to_vec(),
        })
        .collect();
    ok(PermissionCatalogResponse { catalogs })
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::{common::Channel, users::Role},
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_catalog_lists_both_classes(pool: PgPool) {
        let server = create_test_app(pool).await;

        let body: Value = server.get("/permissions/catalog").await.json();
        let catalogs = body["catalogs"].as_array().unwrap();
        assert_eq!(catalogs[0]["tenant_class"], "user");
        assert!(catalogs[0]["features"].as_array().unwrap().contains(&json!("RCS Bots - Manage")));
        assert_eq!(catalogs[1]["tenant_class"], "reseller");
        assert!(catalogs[1]["features"].as_array().unwrap().contains(&json!("Clients - View")));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_revoked_permission_applies_on_next_request(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;
        let user = create_test_user(&pool, Role::User).await;

        server
            .get("/rcs/bots")
            .add_header("authorization", bearer(&user))
            .await
            .assert_status_ok();

        let updated = server
            .put(&format!("/users/{}/permissions", user.id))
            .add_header("authorization", bearer(&admin))
            .json(&json!({
                "team_role": "agent",
                "permissions": [{ "feature": "RCS Bots - View", "admin": true, "manager": true, "agent": false }]
            }))
            .await;
        updated.assert_status_ok();
        let updated: Value = updated.json();
        assert_eq!(updated["team_role"], "agent");
        assert_eq!(updated["permissions"].as_array().unwrap().len(), 1);

        // Same token, fresh permissions
        server
            .get("/rcs/bots")
            .add_header("authorization", bearer(&user))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_permission_entries_checked_against_tenant_catalog(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;
        let reseller = create_test_user(&pool, Role::Reseller).await;

        let response = server
            .put(&format!("/users/{}/permissions", reseller.id))
            .add_header("authorization", bearer(&admin))
            .json(&json!({
                "permissions": [
                    { "feature": "Clients - View", "admin": true },
                    { "feature": "RCS Bots - Manage", "admin": true },
                    { "feature": "Clients - View", "admin": true },
                    { "feature": "Teleport - Use", "admin": true }
                ]
            }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: Value = response.json();
        let fields: Vec<&str> = body["errors"].as_array().unwrap().iter().map(|e| e["field"].as_str().unwrap()).collect();
        assert_eq!(fields, vec!["permissions[1].feature", "permissions[2].feature", "permissions[3].feature"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_user_listing_is_admin_only(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let admin = create_test_admin_user(&pool).await;
        let user = create_test_user(&pool, Role::User).await;
        create_test_user(&pool, Role::Reseller).await;

        let all: Value = server.get("/users").add_header("authorization", bearer(&admin)).await.json();
        assert_eq!(all["total_count"], 3);

        let resellers: Value = server
            .get("/users?role=reseller&limit=5")
            .add_header("authorization", bearer(&admin))
            .await
            .json();
        assert_eq!(resellers["total_count"], 1);
        assert_eq!(resellers["limit"], 5);
        assert_eq!(resellers["users"][0]["role"], "reseller");

        let fetched: Value = server
            .get(&format!("/users/{}", user.id))
            .add_header("authorization", bearer(&admin))
            .await
            .json();
        assert_eq!(fetched["email"], user.email);
        assert!(fetched.get("password_hash").is_none());
        assert!(fetched["channels_enabled"].as_array().unwrap().iter().all(|c| serde_json::from_value::<Channel>(c.clone()).is_ok()));

        server
            .get("/users")
            .add_header("authorization", bearer(&user))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
