//! Vendor CRUD and vendor-user mappings. Platform admins only.

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
            vendors::{
                ListMappingsQuery, VendorCreate, VendorListResponse, VendorMappingListResponse, VendorMappingResponse,
                VendorMappingsReplace, VendorResponse, VendorUpdate,
            },
        },
        validation::ValidatedJson,
    },
    auth::permissions::{RequiresPermission, feature},
    db::{
        handlers::{Repository, Vendors, vendors::VendorFilter},
        models::vendors::{VendorCreateDBRequest, VendorUpdateDBRequest},
    },
    errors::{Error, Result},
    types::VendorId,
};

fn vendor_not_found(id: VendorId) -> Error {
    Error::NotFound {
        resource: "Vendor".to_string(),
        id: id.to_string(),
    }
}

/// List vendors by priority, then name
#[utoipa::path(
    get,
    path = "/vendors",
    tag = "vendors",
    responses(
        (status = 200, description = "Vendors with masked API keys", body = VendorListResponse),
        (status = 403, description = "Platform admins only"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_vendors(
    State(state): State<AppState>,
    _: RequiresPermission<feature::VendorsManage>,
) -> Result<Json<Success<VendorListResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let vendors = Vendors::new(&mut conn).list(&VendorFilter::default()).await?;
    Ok(ok(VendorListResponse {
        vendors: vendors.into_iter().map(VendorResponse::from).collect(),
    }))
}

/// Get a vendor
#[utoipa::path(
    get,
    path = "/vendors/{id}",
    tag = "vendors",
    params(("id" = uuid::Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 200, description = "Vendor with masked API key", body = VendorResponse),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "Vendor not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_vendor(
    State(state): State<AppState>,
    Path(id): Path<VendorId>,
    _: RequiresPermission<feature::VendorsManage>,
) -> Result<Json<Success<VendorResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let vendor = Vendors::new(&mut conn).get_by_id(id).await?.ok_or_else(|| vendor_not_found(id))?;
    Ok(ok(VendorResponse::from(vendor)))
}

/// Create a vendor
#[utoipa::path(
    post,
    path = "/vendors",
    tag = "vendors",
    request_body = VendorCreate,
    responses(
        (status = 201, description = "Vendor created", body = VendorResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Platform admins only"),
        (status = 409, description = "Vendor name already in use"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_vendor(
    State(state): State<AppState>,
    _: RequiresPermission<feature::VendorsManage>,
    ValidatedJson(create): ValidatedJson<VendorCreate>,
) -> Result<(StatusCode, Json<Success<VendorResponse>>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let vendor = Vendors::new(&mut conn).create(&VendorCreateDBRequest::from(create)).await?;
    Ok((StatusCode::CREATED, ok(VendorResponse::from(vendor))))
}

/// Update a vendor (partial)
#[utoipa::path(
    put,
    path = "/vendors/{id}",
    tag = "vendors",
    request_body = VendorUpdate,
    params(("id" = uuid::Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 200, description = "Updated vendor", body = VendorResponse),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "Vendor not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_vendor(
    State(state): State<AppState>,
    Path(id): Path<VendorId>,
    _: RequiresPermission<feature::VendorsManage>,
    ValidatedJson(update): ValidatedJson<VendorUpdate>,
) -> Result<Json<Success<VendorResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let vendor = Vendors::new(&mut conn).update(id, &VendorUpdateDBRequest::from(update)).await?;
    Ok(ok(VendorResponse::from(vendor)))
}

/// Delete a vendor and its user mappings
#[utoipa::path(
    delete,
    path = "/vendors/{id}",
    tag = "vendors",
    params(("id" = uuid::Uuid, Path, description = "Vendor ID")),
    responses(
        (status = 200, description = "Vendor deleted", body = MessageResponse),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "Vendor not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_vendor(
    State(state): State<AppState>,
    Path(id): Path<VendorId>,
    _: RequiresPermission<feature::VendorsManage>,
) -> Result<Json<Success<MessageResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Vendors::new(&mut conn).delete(id).await? {
        return Err(vendor_not_found(id));
    }
    Ok(ok(MessageResponse::new("Vendor deleted successfully")))
}

/// List vendor-user mappings
#[utoipa::path(
    get,
    path = "/vendors/mappings",
    tag = "vendors",
    params(ListMappingsQuery),
    responses(
        (status = 200, description = "Mappings", body = VendorMappingListResponse),
        (status = 403, description = "Platform admins only"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_mappings(
    State(state): State<AppState>,
    Query(query): Query<ListMappingsQuery>,
    _: RequiresPermission<feature::VendorsManage>,
) -> Result<Json<Success<VendorMappingListResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mappings = Vendors::new(&mut conn).list_mappings(query.vendor_id).await?;
    Ok(ok(VendorMappingListResponse {
        mappings: mappings.into_iter().map(VendorMappingResponse::from).collect(),
    }))
}

/// Replace every mapping of a vendor
///
/// The stored set becomes exactly `user_ids`, with duplicates collapsed.
#[utoipa::path(
    post,
    path = "/vendors/mappings",
    tag = "vendors",
    request_body = VendorMappingsReplace,
    responses(
        (status = 200, description = "The vendor's new mappings", body = VendorMappingListResponse),
        (status = 400, description = "Unknown user id"),
        (status = 403, description = "Platform admins only"),
        (status = 404, description = "Vendor not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn replace_mappings(
    State(state): State<AppState>,
    _: RequiresPermission<feature::VendorsManage>,
    ValidatedJson(request): ValidatedJson<VendorMappingsReplace>,
) -> Result<Json<Success<VendorMappingListResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mappings = Vendors::new(&mut conn)
        .replace_mappings(request.vendor_id, &request.user_ids)
        .await
        .map_err(|e| match e {
            crate::db::errors::DbError::NotFound => vendor_not_found(request.vendor_id),
            other => Error::Database(other),
        })?;
    Ok(ok(VendorMappingListResponse {
        mappings: mappings.into_iter().map(VendorMappingResponse::from).collect(),
    }))
}
