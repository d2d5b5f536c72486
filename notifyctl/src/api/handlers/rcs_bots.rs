//! RCS bot configurations. Tenants see their own bots; platform admins see all.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::{
        models::{
            common::MessageResponse,
            envelope::{Success, ok},
            rcs_bots::{ListRcsBotsQuery, RcsBotCreate, RcsBotListResponse, RcsBotResponse, RcsBotUpdate},
        },
        validation::ValidatedJson,
    },
    auth::permissions::{RequiresPermission, feature},
    db::{
        handlers::{RcsBots, Repository, rcs_bots::RcsBotFilter},
        models::rcs_bots::{RcsBotCreateDBRequest, RcsBotUpdateDBRequest},
    },
    errors::{Error, Result},
    types::RcsBotId,
};

fn bot_not_found(id: RcsBotId) -> Error {
    Error::NotFound {
        resource: "RCS bot".to_string(),
        id: id.to_string(),
    }
}

/// List RCS bots
#[utoipa::path(
    get,
    path = "/rcs/bots",
    tag = "rcs",
    params(ListRcsBotsQuery),
    responses(
        (status = 200, description = "Bots with their contacts and media", body = RcsBotListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "RCS bot access not granted"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_bots(
    State(state): State<AppState>,
    Query(query): Query<ListRcsBotsQuery>,
    permission: RequiresPermission<feature::RcsBotsView>,
) -> Result<Json<Success<RcsBotListResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = RcsBotFilter {
        status: query.status,
        ..RcsBotFilter::new(skip, limit)
    };

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = RcsBots::scoped(&mut conn, permission.user.scope());
    let bots = repo.list(&filter).await?;
    let total_count = repo.count(filter.status).await?;

    Ok(ok(RcsBotListResponse {
        bots: bots.into_iter().map(RcsBotResponse::from).collect(),
        total_count,
        skip,
        limit,
    }))
}

/// Get an RCS bot with its contacts and media
#[utoipa::path(
    get,
    path = "/rcs/bots/{id}",
    tag = "rcs",
    params(("id" = uuid::Uuid, Path, description = "Bot ID")),
    responses(
        (status = 200, description = "Bot", body = RcsBotResponse),
        (status = 404, description = "Bot not found or owned by another tenant"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_bot(
    State(state): State<AppState>,
    Path(id): Path<RcsBotId>,
    permission: RequiresPermission<feature::RcsBotsView>,
) -> Result<Json<Success<RcsBotResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let bot = RcsBots::scoped(&mut conn, permission.user.scope())
        .get_by_id(id)
        .await?
        .ok_or_else(|| bot_not_found(id))?;
    Ok(ok(RcsBotResponse::from(bot)))
}

/// Create an RCS bot
///
/// The bot, its contacts and its media are written together or not at all.
#[utoipa::path(
    post,
    path = "/rcs/bots",
    tag = "rcs",
    request_body = RcsBotCreate,
    responses(
        (status = 201, description = "Bot created in draft status", body = RcsBotResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "RCS bot management not granted"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_bot(
    State(state): State<AppState>,
    permission: RequiresPermission<feature::RcsBotsManage>,
    ValidatedJson(create): ValidatedJson<RcsBotCreate>,
) -> Result<(StatusCode, Json<Success<RcsBotResponse>>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let bot = RcsBots::scoped(&mut conn, permission.user.scope())
        .create(&RcsBotCreateDBRequest::new(permission.user.id, create))
        .await?;
    Ok((StatusCode::CREATED, ok(RcsBotResponse::from(bot))))
}

/// Update an RCS bot (partial)
///
/// A supplied `contacts` or `media` list replaces the stored one.
#[utoipa::path(
    put,
    path = "/rcs/bots/{id}",
    tag = "rcs",
    request_body = RcsBotUpdate,
    params(("id" = uuid::Uuid, Path, description = "Bot ID")),
    responses(
        (status = 200, description = "Updated bot", body = RcsBotResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Bot not found or owned by another tenant"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_bot(
    State(state): State<AppState>,
    Path(id): Path<RcsBotId>,
    permission: RequiresPermission<feature::RcsBotsManage>,
    ValidatedJson(update): ValidatedJson<RcsBotUpdate>,
) -> Result<Json<Success<RcsBotResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let bot = RcsBots::scoped(&mut conn, permission.user.scope())
        .update(id, &RcsBotUpdateDBRequest::from(update))
        .await?;
    Ok(ok(RcsBotResponse::from(bot)))
}

/// Delete an RCS bot and its children
#[utoipa::path(
    delete,
    path = "/rcs/bots/{id}",
    tag = "rcs",
    params(("id" = uuid::Uuid, Path, description = "Bot ID")),
    responses(
        (status = 200, description = "Bot deleted", body = MessageResponse),
        (status = 404, description = "Bot not found or owned by another tenant"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_bot(
    State(state): State<AppState>,
    Path(id): Path<RcsBotId>,
    permission: RequiresPermission<feature::RcsBotsManage>,
) -> Result<Json<Success<MessageResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !RcsBots::scoped(&mut conn, permission.user.scope()).delete(id).await? {
        return Err(bot_not_found(id));
    }
    Ok(ok(MessageResponse::new("RCS bot deleted successfully")))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::models::users::{Role, TeamRole},
        test_utils::*,
    };
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    fn bot() -> Value {
        json!({
            "name": "Support Bot",
            "brand_name": "Acme",
            "brand_color": "#1A2B3C",
            "bot_type": "domestic",
            "message_type": "transactional",
            "contacts": [
                { "kind": "phone", "value": "+15550100", "label": "Support" },
                { "kind": "website", "value": "https://acme.example" }
            ],
            "media": [{ "kind": "logo", "url": "https://cdn.example/logo.png" }]
        })
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_and_fetch_with_children(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let response = server.post("/rcs/bots").add_header("authorization", bearer(&user)).json(&bot()).await;
        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        assert_eq!(created["status"], "draft");
        assert_eq!(created["user_id"], user.id.to_string());

        let fetched: Value = server
            .get(&format!("/rcs/bots/{}", created["id"].as_str().unwrap()))
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(fetched["contacts"].as_array().unwrap().len(), 2);
        assert_eq!(fetched["contacts"][0]["label"], "Support");
        assert_eq!(fetched["media"][0]["kind"], "logo");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_replaces_supplied_child_sets_only(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let created: Value = server.post("/rcs/bots").add_header("authorization", bearer(&user)).json(&bot()).await.json();
        let id = created["id"].as_str().unwrap();

        let updated: Value = server
            .put(&format!("/rcs/bots/{id}"))
            .add_header("authorization", bearer(&user))
            .json(&json!({ "status": "submitted", "contacts": [{ "kind": "email", "value": "help@acme.example" }] }))
            .await
            .json();
        assert_eq!(updated["status"], "submitted");
        assert_eq!(updated["name"], "Support Bot");
        assert_eq!(updated["contacts"], json!([{ "kind": "email", "value": "help@acme.example", "label": null }]));
        assert_eq!(updated["media"].as_array().unwrap().len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_text_is_trimmed_and_null_clears_optional_fields(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let mut padded = bot();
        padded["description"] = json!("  Customer support  ");
        padded["contacts"] = json!([{ "kind": "phone", "value": " +15550100 ", "label": format!("Support{}", " ".repeat(120)) }]);
        let created: Value = server.post("/rcs/bots").add_header("authorization", bearer(&user)).json(&padded).await.json();
        assert_eq!(created["description"], "Customer support");
        assert_eq!(created["contacts"], json!([{ "kind": "phone", "value": "+15550100", "label": "Support" }]));
        let id = created["id"].as_str().unwrap();

        let updated: Value = server
            .put(&format!("/rcs/bots/{id}"))
            .add_header("authorization", bearer(&user))
            .json(&json!({ "description": null }))
            .await
            .json();
        assert!(updated["description"].is_null());
        assert_eq!(updated["brand_color"], "#1A2B3C");
        assert_eq!(updated["contacts"].as_array().unwrap().len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_tenants_are_isolated_and_admin_sees_all(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, Role::User).await;
        let stranger = create_test_user(&pool, Role::User).await;
        let admin = create_test_admin_user(&pool).await;

        let created: Value = server.post("/rcs/bots").add_header("authorization", bearer(&owner)).json(&bot()).await.json();
        let id = created["id"].as_str().unwrap();

        server
            .get(&format!("/rcs/bots/{id}"))
            .add_header("authorization", bearer(&stranger))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .put(&format!("/rcs/bots/{id}"))
            .add_header("authorization", bearer(&stranger))
            .json(&json!({ "name": "Hijacked" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .delete(&format!("/rcs/bots/{id}"))
            .add_header("authorization", bearer(&stranger))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        let theirs: Value = server.get("/rcs/bots").add_header("authorization", bearer(&stranger)).await.json();
        assert_eq!(theirs["total_count"], 0);
        let everyone: Value = server.get("/rcs/bots").add_header("authorization", bearer(&admin)).await.json();
        assert_eq!(everyone["total_count"], 1);

        server
            .delete(&format!("/rcs/bots/{id}"))
            .add_header("authorization", bearer(&owner))
            .await
            .assert_status_ok();
        let children: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rcs_bot_contacts").fetch_one(&pool).await.unwrap();
        assert_eq!(children, 0);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_agents_can_view_but_not_manage(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let agent = create_test_user_with_team_role(&pool, Role::User, TeamRole::Agent).await;

        server
            .get("/rcs/bots")
            .add_header("authorization", bearer(&agent))
            .await
            .assert_status_ok();
        server
            .post("/rcs/bots")
            .add_header("authorization", bearer(&agent))
            .json(&bot())
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_invalid_child_rejected_before_any_write(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let mut invalid = bot();
        invalid["media"] = json!([{ "kind": "banner", "url": "" }]);
        let response = server.post("/rcs/bots").add_header("authorization", bearer(&user)).json(&invalid).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["errors"][0]["field"], "media[0].url");

        let bots: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rcs_bots").fetch_one(&pool).await.unwrap();
        assert_eq!(bots, 0);
    }
}
