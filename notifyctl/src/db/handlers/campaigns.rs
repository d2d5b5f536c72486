//! Database repository for campaigns.
//!
//! A campaign may reference a template, which must belong to the same tenant as the campaign.
//! Violations surface as [`DbError::ForeignKeyViolation`] with the `campaigns_template_owner`
//! constraint name so they map to a 400 like any other bad reference.

use crate::{
    api::models::{campaigns::CampaignStatus, common::Channel},
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::campaigns::{CampaignCreateDBRequest, CampaignDBResponse, CampaignUpdateDBRequest},
    },
    types::{CampaignId, TemplateId, TenantScope, UserId, abbrev_uuid},
};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

pub const TEMPLATE_OWNER_CONSTRAINT: &str = "campaigns_template_owner";

/// Filter for listing campaigns
#[derive(Debug, Clone)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl CampaignFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { status: None, skip, limit }
    }

    pub fn with_status(mut self, status: Option<CampaignStatus>) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, FromRow)]
struct Campaign {
    pub id: CampaignId,
    pub user_id: UserId,
    pub name: String,
    pub channel: Channel,
    pub status: CampaignStatus,
    pub template_id: Option<TemplateId>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub audience_size: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignDBResponse {
    fn from(c: Campaign) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            name: c.name,
            channel: c.channel,
            status: c.status,
            template_id: c.template_id,
            scheduled_at: c.scheduled_at,
            audience_size: c.audience_size,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

pub struct Campaigns<'c> {
    db: &'c mut PgConnection,
    scope: TenantScope,
}

#[async_trait::async_trait]
impl<'c> Repository for Campaigns<'c> {
    type CreateRequest = CampaignCreateDBRequest;
    type UpdateRequest = CampaignUpdateDBRequest;
    type Response = CampaignDBResponse;
    type Id = CampaignId;
    type Filter = CampaignFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), channel = %request.channel), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        if let Some(template_id) = request.template_id {
            ensure_template_owner(&mut tx, template_id, request.user_id).await?;
        }

        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (id, user_id, name, channel, template_id, scheduled_at, audience_size, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7,
                    CASE WHEN $6::timestamptz IS NULL THEN 'draft' ELSE 'scheduled' END::campaign_status)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.name)
        .bind(request.channel)
        .bind(request.template_id)
        .bind(request.scheduled_at)
        .bind(request.audience_size)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(campaign.into())
    }

    #[instrument(skip(self), fields(campaign_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let campaign = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id)
            .bind(self.scope.owner())
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(campaign.map(Into::into))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let campaigns = sqlx::query_as::<_, Campaign>(
            r#"
            SELECT * FROM campaigns
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::campaign_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(self.scope.owner())
        .bind(filter.status)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(campaigns.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(campaign_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id)
            .bind(self.scope.owner())
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(campaign_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let owner: UserId = sqlx::query_scalar("SELECT user_id FROM campaigns WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2) FOR UPDATE")
            .bind(id)
            .bind(self.scope.owner())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::NotFound)?;

        if let Some(template_id) = request.template_id {
            ensure_template_owner(&mut tx, template_id, owner).await?;
        }

        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns SET
                name = COALESCE($2, name),
                channel = COALESCE($3, channel),
                status = COALESCE($4, status),
                template_id = COALESCE($5, template_id),
                scheduled_at = COALESCE($6, scheduled_at),
                audience_size = COALESCE($7, audience_size),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(request.channel)
        .bind(request.status)
        .bind(request.template_id)
        .bind(request.scheduled_at)
        .bind(request.audience_size)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(campaign.into())
    }
}

impl<'c> Campaigns<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self {
            db,
            scope: TenantScope::All,
        }
    }

    pub fn scoped(db: &'c mut PgConnection, scope: TenantScope) -> Self {
        Self { db, scope }
    }

    #[instrument(skip(self), err)]
    pub async fn count(&mut self, status: Option<CampaignStatus>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM campaigns WHERE ($1::uuid IS NULL OR user_id = $1) AND ($2::campaign_status IS NULL OR status = $2)",
        )
        .bind(self.scope.owner())
        .bind(status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }
}

async fn ensure_template_owner(conn: &mut PgConnection, template_id: TemplateId, owner: UserId) -> Result<()> {
    let owned: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM templates WHERE id = $1 AND user_id = $2)")
        .bind(template_id)
        .bind(owner)
        .fetch_one(&mut *conn)
        .await?;

    if owned {
        Ok(())
    } else {
        Err(DbError::ForeignKeyViolation {
            constraint: Some(TEMPLATE_OWNER_CONSTRAINT.to_string()),
            table: Some("campaigns".to_string()),
            message: format!("template {} does not belong to the campaign owner", abbrev_uuid(&template_id)),
        })
    }
}
