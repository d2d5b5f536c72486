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
            templates::{ListTemplatesQuery, TemplateCreate, TemplateListResponse, TemplateResponse, TemplateUpdate},
        },
        validation::ValidatedJson,
    },
    auth::permissions::{RequiresPermission, feature},
    db::{
        handlers::{Repository, Templates, templates::TemplateFilter},
        models::templates::{TemplateCreateDBRequest, TemplateUpdateDBRequest},
    },
    errors::{Error, Result},
    types::TemplateId,
};

fn template_not_found(id: TemplateId) -> Error {
    Error::NotFound {
        resource: "Template".to_string(),
        id: id.to_string(),
    }
}

/// List message templates, optionally by channel
#[utoipa::path(
    get,
    path = "/templates",
    tag = "templates",
    params(ListTemplatesQuery),
    responses(
        (status = 200, description = "Templates, newest first", body = TemplateListResponse),
        (status = 403, description = "Template access not granted"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_templates(
    State(state): State<AppState>,
    Query(query): Query<ListTemplatesQuery>,
    permission: RequiresPermission<feature::TemplatesView>,
) -> Result<Json<Success<TemplateListResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = TemplateFilter::new(skip, limit).with_channel(query.channel);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Templates::scoped(&mut conn, permission.user.scope());
    let templates = repo.list(&filter).await?;
    let total_count = repo.count(filter.channel).await?;

    Ok(ok(TemplateListResponse {
        templates: templates.into_iter().map(TemplateResponse::from).collect(),
        total_count,
        skip,
        limit,
    }))
}

/// Get a template
#[utoipa::path(
    get,
    path = "/templates/{id}",
    tag = "templates",
    params(("id" = uuid::Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template", body = TemplateResponse),
        (status = 404, description = "Template not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<TemplateId>,
    permission: RequiresPermission<feature::TemplatesView>,
) -> Result<Json<Success<TemplateResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let template = Templates::scoped(&mut conn, permission.user.scope())
        .get_by_id(id)
        .await?
        .ok_or_else(|| template_not_found(id))?;
    Ok(ok(TemplateResponse::from(template)))
}

/// Create a template in draft status
#[utoipa::path(
    post,
    path = "/templates",
    tag = "templates",
    request_body = TemplateCreate,
    responses(
        (status = 201, description = "Template created", body = TemplateResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Template management not granted"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_template(
    State(state): State<AppState>,
    permission: RequiresPermission<feature::TemplatesManage>,
    ValidatedJson(create): ValidatedJson<TemplateCreate>,
) -> Result<(StatusCode, Json<Success<TemplateResponse>>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let template = Templates::scoped(&mut conn, permission.user.scope())
        .create(&TemplateCreateDBRequest::new(permission.user.id, create))
        .await?;
    Ok((StatusCode::CREATED, ok(TemplateResponse::from(template))))
}

/// Update a template (partial)
#[utoipa::path(
    put,
    path = "/templates/{id}",
    tag = "templates",
    request_body = TemplateUpdate,
    params(("id" = uuid::Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Updated template", body = TemplateResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Template not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<TemplateId>,
    permission: RequiresPermission<feature::TemplatesManage>,
    ValidatedJson(update): ValidatedJson<TemplateUpdate>,
) -> Result<Json<Success<TemplateResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let template = Templates::scoped(&mut conn, permission.user.scope())
        .update(id, &TemplateUpdateDBRequest::from(update))
        .await?;
    Ok(ok(TemplateResponse::from(template)))
}

/// Delete a template
///
/// Campaigns that used it keep running without a template.
#[utoipa::path(
    delete,
    path = "/templates/{id}",
    tag = "templates",
    params(("id" = uuid::Uuid, Path, description = "Template ID")),
    responses(
        (status = 200, description = "Template deleted", body = MessageResponse),
        (status = 404, description = "Template not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<TemplateId>,
    permission: RequiresPermission<feature::TemplatesManage>,
) -> Result<Json<Success<MessageResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Templates::scoped(&mut conn, permission.user.scope()).delete(id).await? {
        return Err(template_not_found(id));
    }
    Ok(ok(MessageResponse::new("Template deleted successfully")))
}

#[cfg(test)]
mod tests {
    use crate::{api::models::users::Role, test_utils::*};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_template_lifecycle(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let response = server
            .post("/templates")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "OTP", "channel": "sms", "category": "auth", "content": "Your code is {{code}}" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        assert_eq!(created["status"], "draft");
        let id = created["id"].as_str().unwrap();

        let updated: Value = server
            .put(&format!("/templates/{id}"))
            .add_header("authorization", bearer(&user))
            .json(&json!({ "status": "approved" }))
            .await
            .json();
        assert_eq!(updated["status"], "approved");
        assert_eq!(updated["content"], "Your code is {{code}}");

        server
            .post("/templates")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Newsletter", "channel": "email", "content": "Hello" }))
            .await
            .assert_status(StatusCode::CREATED);

        let sms_only: Value = server
            .get("/templates?channel=sms")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(sms_only["total_count"], 1);
        assert_eq!(sms_only["templates"][0]["name"], "OTP");

        server
            .delete(&format!("/templates/{id}"))
            .add_header("authorization", bearer(&user))
            .await
            .assert_status_ok();
        server
            .get(&format!("/templates/{id}"))
            .add_header("authorization", bearer(&user))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_empty_content_rejected(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        let response = server
            .post("/templates")
            .add_header("authorization", bearer(&user))
            .json(&json!({ "name": "Blank", "channel": "sms", "content": "" }))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["errors"][0]["field"], "content");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_other_tenants_templates_are_hidden(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, Role::User).await;
        let stranger = create_test_user(&pool, Role::User).await;

        let created: Value = server
            .post("/templates")
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "name": "Private", "channel": "sms", "content": "Secret" }))
            .await
            .json();

        server
            .put(&format!("/templates/{}", created["id"].as_str().unwrap()))
            .add_header("authorization", bearer(&stranger))
            .json(&json!({ "content": "Defaced" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        let listed: Value = server.get("/templates").add_header("authorization", bearer(&stranger)).await.json();
        assert_eq!(listed["total_count"], 0);
    }
}
