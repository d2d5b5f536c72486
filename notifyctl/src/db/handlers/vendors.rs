//! Database repository for vendors and their user mappings.
//!
//! The stored `api_key` is write-only: no query here ever selects it, only whether it is set.

use crate::{
    api::models::common::{Channel, RecordStatus},
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::{
            decode_json_list, encode_json_list,
            vendors::{VendorCreateDBRequest, VendorDBResponse, VendorMappingDBResponse, VendorUpdateDBRequest},
        },
    },
    types::{UserId, VendorId, abbrev_uuid},
};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use std::collections::BTreeSet;
use tracing::instrument;
use uuid::Uuid;

const VENDOR_COLUMNS: &str =
    "id, name, vendor_type, api_url, api_key IS NOT NULL AS has_api_key, priority, channels, status, created_at, updated_at";

/// Filter for listing vendors
#[derive(Debug, Clone, Default)]
pub struct VendorFilter {
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, FromRow)]
struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub vendor_type: String,
    pub api_url: String,
    pub has_api_key: bool,
    pub priority: i32,
    pub channels: serde_json::Value,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vendor> for VendorDBResponse {
    fn from(v: Vendor) -> Self {
        Self {
            id: v.id,
            name: v.name,
            vendor_type: v.vendor_type,
            api_url: v.api_url,
            has_api_key: v.has_api_key,
            priority: v.priority,
            channels: decode_json_list("vendors.channels", v.channels),
            status: v.status,
            created_at: v.created_at,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct VendorMapping {
    pub vendor_id: VendorId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<VendorMapping> for VendorMappingDBResponse {
    fn from(m: VendorMapping) -> Self {
        Self {
            vendor_id: m.vendor_id,
            user_id: m.user_id,
            created_at: m.created_at,
        }
    }
}

pub struct Vendors<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Vendors<'c> {
    type CreateRequest = VendorCreateDBRequest;
    type UpdateRequest = VendorUpdateDBRequest;
    type Response = VendorDBResponse;
    type Id = VendorId;
    type Filter = VendorFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            r#"
            INSERT INTO vendors (id, name, vendor_type, api_url, api_key, priority, channels)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {VENDOR_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(&request.vendor_type)
        .bind(&request.api_url)
        .bind(&request.api_key)
        .bind(request.priority)
        .bind(encode_json_list(&request.channels))
        .fetch_one(&mut *self.db)
        .await?;

        Ok(VendorDBResponse::from(vendor))
    }

    #[instrument(skip(self), fields(vendor_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let vendor = sqlx::query_as::<_, Vendor>(&format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(vendor.map(VendorDBResponse::from))
    }

    /// Ordered by priority, then name.
    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let vendors = sqlx::query_as::<_, Vendor>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE ($1::record_status IS NULL OR status = $1) ORDER BY priority, name"
        ))
        .bind(filter.status)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(vendors.into_iter().map(VendorDBResponse::from).collect())
    }

    /// Removes the vendor's mappings and then the vendor, atomically.
    #[instrument(skip(self), fields(vendor_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        let mappings = sqlx::query("DELETE FROM vendor_user_mappings WHERE vendor_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM vendors WHERE id = $1").bind(id).execute(&mut *tx).await?;

        tx.commit().await?;
        tracing::debug!(mappings = mappings.rows_affected(), "Deleted vendor mappings");
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(vendor_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let channels = request.channels.as_deref().map(encode_json_list::<Channel>);

        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            r#"
            UPDATE vendors SET
                name = COALESCE($2, name),
                vendor_type = COALESCE($3, vendor_type),
                api_url = COALESCE($4, api_url),
                api_key = COALESCE($5, api_key),
                priority = COALESCE($6, priority),
                channels = COALESCE($7, channels),
                status = COALESCE($8, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {VENDOR_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&request.name)
        .bind(&request.vendor_type)
        .bind(&request.api_url)
        .bind(&request.api_key)
        .bind(request.priority)
        .bind(channels)
        .bind(request.status)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(VendorDBResponse::from(vendor))
    }
}

impl<'c> Vendors<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn list_mappings(&mut self, vendor_id: Option<VendorId>) -> Result<Vec<VendorMappingDBResponse>> {
        let mappings = sqlx::query_as::<_, VendorMapping>(
            r#"
            SELECT vendor_id, user_id, created_at FROM vendor_user_mappings
            WHERE ($1::uuid IS NULL OR vendor_id = $1)
            ORDER BY vendor_id, created_at, user_id
            "#,
        )
        .bind(vendor_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(mappings.into_iter().map(VendorMappingDBResponse::from).collect())
    }

    /// Replace every mapping of a vendor with `user_ids` (duplicates collapsed).
    ///
    /// Fails with `NotFound` for an unknown vendor and `ForeignKeyViolation` for unknown users.
    #[instrument(skip(self, user_ids), fields(vendor_id = %abbrev_uuid(&vendor_id), count = user_ids.len()), err)]
    pub async fn replace_mappings(&mut self, vendor_id: VendorId, user_ids: &[UserId]) -> Result<Vec<VendorMappingDBResponse>> {
        let unique: Vec<UserId> = user_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

        let mut tx = self.db.begin().await?;

        sqlx::query_scalar::<_, VendorId>("SELECT id FROM vendors WHERE id = $1 FOR UPDATE")
            .bind(vendor_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        sqlx::query("DELETE FROM vendor_user_mappings WHERE vendor_id = $1")
            .bind(vendor_id)
            .execute(&mut *tx)
            .await?;

        let mappings = sqlx::query_as::<_, VendorMapping>(
            r#"
            INSERT INTO vendor_user_mappings (vendor_id, user_id)
            SELECT $1, UNNEST($2::uuid[])
            RETURNING vendor_id, user_id, created_at
            "#,
        )
        .bind(vendor_id)
        .bind(&unique)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(mappings.into_iter().map(VendorMappingDBResponse::from).collect())
    }
}
