use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::{
        models::{
            campaigns::{CampaignCreate, CampaignListResponse, CampaignResponse, CampaignUpdate, ListCampaignsQuery},
            common::MessageResponse,
            envelope::{Success, ok},
        },
        validation::ValidatedJson,
    },
    auth::permissions::{RequiresPermission, feature},
    db::{
        handlers::{Campaigns, Repository, campaigns::CampaignFilter},
        models::campaigns::{CampaignCreateDBRequest, CampaignUpdateDBRequest},
    },
    errors::{Error, Result},
    types::CampaignId,
};

fn campaign_not_found(id: CampaignId) -> Error {
    Error::NotFound {
        resource: "Campaign".to_string(),
        id: id.to_string(),
    }
}

/// List campaigns, optionally by status
#[utoipa::path(
    get,
    path = "/campaigns",
    tag = "campaigns",
    params(ListCampaignsQuery),
    responses(
        (status = 200, description = "Campaigns, newest first", body = CampaignListResponse),
        (status = 403, description = "Campaign access not granted"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<ListCampaignsQuery>,
    permission: RequiresPermission<feature::CampaignsView>,
) -> Result<Json<Success<CampaignListResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = CampaignFilter::new(skip, limit).with_status(query.status);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Campaigns::scoped(&mut conn, permission.user.scope());
    let campaigns = repo.list(&filter).await?;
    let total_count = repo.count(filter.status).await?;

    Ok(ok(CampaignListResponse {
        campaigns: campaigns.into_iter().map(CampaignResponse::from).collect(),
        total_count,
        skip,
        limit,
    }))
}

/// Get a campaign
#[utoipa::path(
    get,
    path = "/campaigns/{id}",
    tag = "campaigns",
    params(("id" = uuid::Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Campaign", body = CampaignResponse),
        (status = 404, description = "Campaign not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    permission: RequiresPermission<feature::CampaignsView>,
) -> Result<Json<Success<CampaignResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let campaign = Campaigns::scoped(&mut conn, permission.user.scope())
        .get_by_id(id)
        .await?
        .ok_or_else(|| campaign_not_found(id))?;
    Ok(ok(CampaignResponse::from(campaign)))
}

/// Create a campaign
///
/// Starts as `scheduled` when `scheduled_at` is given, otherwise `draft`.
#[utoipa::path(
    post,
    path = "/campaigns",
    tag = "campaigns",
    request_body = CampaignCreate,
    responses(
        (status = 201, description = "Campaign created", body = CampaignResponse),
        (status = 400, description = "Validation failed or template not owned by the caller"),
        (status = 403, description = "Campaign creation not granted"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_campaign(
    State(state): State<AppState>,
    permission: RequiresPermission<feature::CampaignsCreate>,
    ValidatedJson(create): ValidatedJson<CampaignCreate>,
) -> Result<(StatusCode, Json<Success<CampaignResponse>>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let campaign = Campaigns::scoped(&mut conn, permission.user.scope())
        .create(&CampaignCreateDBRequest::new(permission.user.id, create))
        .await?;
    Ok((StatusCode::CREATED, ok(CampaignResponse::from(campaign))))
}

/// Update a campaign (partial)
#[utoipa::path(
    put,
    path = "/campaigns/{id}",
    tag = "campaigns",
    request_body = CampaignUpdate,
    params(("id" = uuid::Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Updated campaign", body = CampaignResponse),
        (status = 400, description = "Validation failed or template not owned by the campaign owner"),
        (status = 404, description = "Campaign not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    permission: RequiresPermission<feature::CampaignsEdit>,
    ValidatedJson(update): ValidatedJson<CampaignUpdate>,
) -> Result<Json<Success<CampaignResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let campaign = Campaigns::scoped(&mut conn, permission.user.scope())
        .update(id, &CampaignUpdateDBRequest::from(update))
        .await?;
    Ok(ok(CampaignResponse::from(campaign)))
}

/// Delete a campaign
#[utoipa::path(
    delete,
    path = "/campaigns/{id}",
    tag = "campaigns",
    params(("id" = uuid::Uuid, Path, description = "Campaign ID")),
    responses(
        (status = 200, description = "Campaign deleted", body = MessageResponse),
        (status = 404, description = "Campaign not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_campaign(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    permission: RequiresPermission<feature::CampaignsDelete>,
) -> Result<Json<Success<MessageResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Campaigns::scoped(&mut conn, permission.user.scope()).delete(id).await? {
        return Err(campaign_not_found(id));
    }
    Ok(ok(MessageResponse::new("Campaign deleted successfully")))
}

#[cfg(test)]
mod tests {
    use crate::{api::models::users::Role, test_utils::*};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    async fn create_template(server: &axum_test::TestServer, token: &str) -> String {
        let template: Value = server
            .post("/templates")
            .add_header("authorization", token.to_string())
            .json(&json!({ "name": "Welcome", "channel": "sms", "content": "Hi {{name}}" }))
            .await
            .json();
        template["id"].as_str().unwrap().to_string()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_initial_status_follows_schedule(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let draft: Value = server
            .post("/campaigns")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Spring sale", "channel": "sms" }))
            .await
            .json();
        assert_eq!(draft["status"], "draft");

        let scheduled = server
            .post("/campaigns")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Summer sale", "channel": "email", "scheduled_at": "2030-06-01T09:00:00Z" }))
            .await;
        scheduled.assert_status(StatusCode::CREATED);
        assert_eq!(scheduled.json::<Value>()["status"], "scheduled");

        let only_drafts: Value = server
            .get("/campaigns?status=draft")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(only_drafts["total_count"], 1);
        assert_eq!(only_drafts["campaigns"][0]["name"], "Spring sale");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_template_must_belong_to_same_tenant(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, Role::User).await;
        let stranger = create_test_user(&pool, Role::User).await;

        let template_id = create_template(&server, &bearer(&owner)).await;

        let foreign = server
            .post("/campaigns")
            .add_header("authorization", bearer(&stranger))
            .json(&json!({ "name": "Borrowed", "channel": "sms", "template_id": template_id }))
            .await;
        foreign.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(foreign.json::<Value>()["message"], "Template not found for this account");

        let own: Value = server
            .post("/campaigns")
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "name": "Mine", "channel": "sms", "template_id": template_id }))
            .await
            .json();
        assert_eq!(own["template_id"], template_id);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_partial_update_and_isolation(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, Role::User).await;
        let stranger = create_test_user(&pool, Role::User).await;

        let created: Value = server
            .post("/campaigns")
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "name": "Launch", "channel": "whatsapp", "audience_size": 500 }))
            .await
            .json();
        let id = created["id"].as_str().unwrap();

        let updated: Value = server
            .put(&format!("/campaigns/{id}"))
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "status": "paused" }))
            .await
            .json();
        assert_eq!(updated["status"], "paused");
        assert_eq!(updated["audience_size"], 500);
        assert_eq!(updated["channel"], "whatsapp");

        for request in [
            server.get(&format!("/campaigns/{id}")),
            server.delete(&format!("/campaigns/{id}")),
        ] {
            request
                .add_header("authorization", bearer(&stranger))
                .await
                .assert_status(StatusCode::NOT_FOUND);
        }

        server
            .delete(&format!("/campaigns/{id}"))
            .add_header("authorization", bearer(&owner))
            .await
            .assert_status_ok();
    }
}
