//! Database repository for message templates.

use crate::{
    api::models::{common::Channel, templates::TemplateStatus},
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::templates::{TemplateCreateDBRequest, TemplateDBResponse, TemplateUpdateDBRequest},
    },
    types::{TemplateId, TenantScope, UserId, abbrev_uuid},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing templates
#[derive(Debug, Clone)]
pub struct TemplateFilter {
    pub channel: Option<Channel>,
    pub skip: i64,
    pub limit: i64,
}

impl TemplateFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { channel: None, skip, limit }
    }

    pub fn with_channel(mut self, channel: Option<Channel>) -> Self {
        self.channel = channel;
        self
    }
}

#[derive(Debug, Clone, FromRow)]
struct Template {
    pub id: TemplateId,
    pub user_id: UserId,
    pub name: String,
    pub channel: Channel,
    pub category: Option<String>,
    pub content: String,
    pub status: TemplateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Template> for TemplateDBResponse {
    fn from(t: Template) -> Self {
        Self {
            id: t.id,
            user_id: t.user_id,
            name: t.name,
            channel: t.channel,
            category: t.category,
            content: t.content,
            status: t.status,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

pub struct Templates<'c> {
    db: &'c mut PgConnection,
    scope: TenantScope,
}

#[async_trait::async_trait]
impl<'c> Repository for Templates<'c> {
    type CreateRequest = TemplateCreateDBRequest;
    type UpdateRequest = TemplateUpdateDBRequest;
    type Response = TemplateDBResponse;
    type Id = TemplateId;
    type Filter = TemplateFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), channel = %request.channel), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let template = sqlx::query_as::<_, Template>(
            r#"
            INSERT INTO templates (id, user_id, name, channel, category, content)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.name)
        .bind(request.channel)
        .bind(&request.category)
        .bind(&request.content)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(template.into())
    }

    #[instrument(skip(self), fields(template_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let template = sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id)
            .bind(self.scope.owner())
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(template.map(Into::into))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let templates = sqlx::query_as::<_, Template>(
            r#"
            SELECT * FROM templates
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::channel IS NULL OR channel = $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(self.scope.owner())
        .bind(filter.channel)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(templates.into_iter().map(Into::into).collect())
    }

    /// Campaigns referencing the template keep running without it (`ON DELETE SET NULL`).
    #[instrument(skip(self), fields(template_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id)
            .bind(self.scope.owner())
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(template_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let template = sqlx::query_as::<_, Template>(
            r#"
            UPDATE templates SET
                name = COALESCE($3, name),
                channel = COALESCE($4, channel),
                category = CASE WHEN $5 THEN $6 ELSE category END,
                content = COALESCE($7, content),
                status = COALESCE($8, status),
                updated_at = NOW()
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(self.scope.owner())
        .bind(&request.name)
        .bind(request.channel)
        .bind(request.category.is_some())
        .bind(request.category.as_ref().and_then(|c| c.as_deref()))
        .bind(&request.content)
        .bind(request.status)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(template.into())
    }
}

impl<'c> Templates<'c> {
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
    pub async fn count(&mut self, channel: Option<Channel>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM templates WHERE ($1::uuid IS NULL OR user_id = $1) AND ($2::channel IS NULL OR channel = $2)",
        )
        .bind(self.scope.owner())
        .bind(channel)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }
}
