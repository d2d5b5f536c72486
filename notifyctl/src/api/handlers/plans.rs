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
            plans::{ListPlansQuery, PlanCreate, PlanListResponse, PlanResponse, PlanUpdate},
            users::CurrentUser,
        },
        validation::ValidatedJson,
    },
    auth::permissions::{AuthorizedUser, Feature, RequiresPermission, feature},
    db::{
        handlers::{Plans, Repository, plans::PlanFilter},
        models::plans::{PlanCreateDBRequest, PlanUpdateDBRequest},
    },
    errors::{Error, Result},
    types::PlanId,
};

fn plan_not_found(id: PlanId) -> Error {
    Error::NotFound {
        resource: "Plan".to_string(),
        id: id.to_string(),
    }
}

/// List plans
///
/// Public: returns active plans. `?all=true` returns plans of any status and requires a platform
/// admin. Sorted by ascending price, then name.
#[utoipa::path(
    get,
    path = "/plans",
    tag = "plans",
    params(ListPlansQuery),
    responses(
        (status = 200, description = "Plans sorted by price", body = PlanListResponse),
        (status = 401, description = "`all=true` without a token"),
        (status = 403, description = "`all=true` for a non-admin"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_plans(
    State(state): State<AppState>,
    Query(query): Query<ListPlansQuery>,
    current: Option<CurrentUser>,
) -> Result<Json<Success<PlanListResponse>>> {
    if query.all {
        let current = current.ok_or_else(|| Error::Unauthenticated {
            message: Some("No token provided".to_string()),
        })?;
        if !AuthorizedUser::load(&state, &current).await?.is_platform_admin() {
            return Err(Error::InsufficientPermissions {
                feature: Feature::PlansManage,
            });
        }
    }

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plans = Plans::new(&mut conn)
        .list(&PlanFilter {
            include_inactive: query.all,
        })
        .await?;

    Ok(ok(PlanListResponse {
        plans: plans.into_iter().map(PlanResponse::from).collect(),
    }))
}

/// Get a plan
#[utoipa::path(
    get,
    path = "/plans/{id}",
    tag = "plans",
    params(("id" = uuid::Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Plan", body = PlanResponse),
        (status = 404, description = "Plan not found"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_plan(State(state): State<AppState>, Path(id): Path<PlanId>) -> Result<Json<Success<PlanResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plan = Plans::new(&mut conn).get_by_id(id).await?.ok_or_else(|| plan_not_found(id))?;
    Ok(ok(PlanResponse::from(plan)))
}

/// Create a plan
#[utoipa::path(
    post,
    path = "/plans",
    tag = "plans",
    request_body = PlanCreate,
    responses(
        (status = 201, description = "Plan created", body = PlanResponse),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Platform admins only"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_plan(
    State(state): State<AppState>,
    _: RequiresPermission<feature::PlansManage>,
    ValidatedJson(create): ValidatedJson<PlanCreate>,
) -> Result<(StatusCode, Json<Success<PlanResponse>>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plan = Plans::new(&mut conn).create(&PlanCreateDBRequest::from(create)).await?;
    Ok((StatusCode::CREATED, ok(PlanResponse::from(plan))))
}

/// Update a plan (partial)
#[utoipa::path(
    put,
    path = "/plans/{id}",
    tag = "plans",
    request_body = PlanUpdate,
    params(("id" = uuid::Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Updated plan", body = PlanResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "Plan not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_plan(
    State(state): State<AppState>,
    Path(id): Path<PlanId>,
    _: RequiresPermission<feature::PlansManage>,
    ValidatedJson(update): ValidatedJson<PlanUpdate>,
) -> Result<Json<Success<PlanResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plan = Plans::new(&mut conn).update(id, &PlanUpdateDBRequest::from(update)).await?;
    Ok(ok(PlanResponse::from(plan)))
}

/// Delete a plan
///
/// Users and resellers on the plan are left without one.
#[utoipa::path(
    delete,
    path = "/plans/{id}",
    tag = "plans",
    params(("id" = uuid::Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Plan deleted", body = MessageResponse),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "Plan not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_plan(
    State(state): State<AppState>,
    Path(id): Path<PlanId>,
    _: RequiresPermission<feature::PlansManage>,
) -> Result<Json<Success<MessageResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Plans::new(&mut conn).delete(id).await? {
        return Err(plan_not_found(id));
    }
    Ok(ok(MessageResponse::new("Plan deleted successfully")))
}

/// Flip a plan between active and inactive
#[utoipa::path(
    patch,
    path = "/plans/{id}/toggle",
    tag = "plans",
    params(("id" = uuid::Uuid, Path, description = "Plan ID")),
    responses(
        (status = 200, description = "Plan with its new status", body = PlanResponse),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "Plan not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn toggle_plan(
    State(state): State<AppState>,
    Path(id): Path<PlanId>,
    _: RequiresPermission<feature::PlansManage>,
) -> Result<Json<Success<PlanResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let plan = Plans::new(&mut conn).toggle_status(id).await?;
    Ok(ok(PlanResponse::from(plan)))
}
