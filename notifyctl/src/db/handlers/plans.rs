//! Database repository for plans.

use crate::{
    api::models::common::{Channel, RecordStatus},
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::{
            decode_json_list, encode_json_list,
            plans::{PlanCreateDBRequest, PlanDBResponse, PlanUpdateDBRequest},
        },
    },
    types::{PlanId, abbrev_uuid},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing plans
#[derive(Debug, Clone, Default)]
pub struct PlanFilter {
    /// Include inactive plans as well as active ones
    pub include_inactive: bool,
}

#[derive(Debug, Clone, FromRow)]
struct Plan {
    pub id: PlanId,
    pub name: String,
    pub price: Decimal,
    pub monthly_credits: i64,
    pub client_count: i32,
    pub channels_allowed: serde_json::Value,
    pub automation_limit: i32,
    pub campaign_limit: i32,
    pub api_access: bool,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Plan> for PlanDBResponse {
    fn from(plan: Plan) -> Self {
        Self {
            id: plan.id,
            name: plan.name,
            price: plan.price,
            monthly_credits: plan.monthly_credits,
            client_count: plan.client_count,
            channels_allowed: decode_json_list("plans.channels_allowed", plan.channels_allowed),
            automation_limit: plan.automation_limit,
            campaign_limit: plan.campaign_limit,
            api_access: plan.api_access,
            status: plan.status,
            created_at: plan.created_at,
            updated_at: plan.updated_at,
        }
    }
}

pub struct Plans<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Plans<'c> {
    type CreateRequest = PlanCreateDBRequest;
    type UpdateRequest = PlanUpdateDBRequest;
    type Response = PlanDBResponse;
    type Id = PlanId;
    type Filter = PlanFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            INSERT INTO plans (id, name, price, monthly_credits, client_count, channels_allowed, automation_limit, campaign_limit, api_access)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(request.price)
        .bind(request.monthly_credits)
        .bind(request.client_count)
        .bind(encode_json_list(&request.channels_allowed))
        .bind(request.automation_limit)
        .bind(request.campaign_limit)
        .bind(request.api_access)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(PlanDBResponse::from(plan))
    }

    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(plan.map(PlanDBResponse::from))
    }

    /// Ordered by ascending price, then name.
    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let plans = sqlx::query_as::<_, Plan>(
            r#"
            SELECT * FROM plans
            WHERE $1 OR status = 'active'
            ORDER BY price ASC, name ASC, id ASC
            "#,
        )
        .bind(filter.include_inactive)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(plans.into_iter().map(PlanDBResponse::from).collect())
    }

    /// Users and resellers on the plan are left without one (`ON DELETE SET NULL`).
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(plan_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let channels = request.channels_allowed.as_deref().map(encode_json_list::<Channel>);

        let plan = sqlx::query_as::<_, Plan>(
            r#"
            UPDATE plans SET
                name = COALESCE($2, name),
                price = COALESCE($3, price),
                monthly_credits = COALESCE($4, monthly_credits),
                client_count = COALESCE($5, client_count),
                channels_allowed = COALESCE($6, channels_allowed),
                automation_limit = COALESCE($7, automation_limit),
                campaign_limit = COALESCE($8, campaign_limit),
                api_access = COALESCE($9, api_access),
                status = COALESCE($10, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(request.price)
        .bind(request.monthly_credits)
        .bind(request.client_count)
        .bind(channels)
        .bind(request.automation_limit)
        .bind(request.campaign_limit)
        .bind(request.api_access)
        .bind(request.status)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(PlanDBResponse::from(plan))
    }
}

impl<'c> Plans<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Flip active/inactive in a single statement.
    #[instrument(skip(self), fields(plan_id = %abbrev_uuid(&id)), err)]
    pub async fn toggle_status(&mut self, id: PlanId) -> Result<PlanDBResponse> {
        let plan = sqlx::query_as::<_, Plan>(
            r#"
            UPDATE plans SET
                status = CASE WHEN status = 'active' THEN 'inactive'::record_status ELSE 'active'::record_status END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(PlanDBResponse::from(plan))
    }
}
