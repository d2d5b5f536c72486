//! Database repository for resellers.
//!
//! Every reseller row is paired with exactly one `users` row of role `reseller`. The pair is
//! created in one transaction, and name/email changes are written to both rows together.

use crate::{
    api::models::{
        common::{Channel, RecordStatus},
        users::{Role, TeamRole},
    },
    db::{
        errors::{DbError, Result},
        handlers::{repository::Repository, users::Users},
        models::{
            decode_json_list, encode_json_list,
            resellers::{ResellerCreateDBRequest, ResellerDBResponse, ResellerUpdateDBRequest},
            users::{UserCreateDBRequest, UserUpdateDBRequest},
        },
    },
    types::{PlanId, ResellerId, UserId, abbrev_uuid},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing resellers
#[derive(Debug, Clone, Default)]
pub struct ResellerFilter {
    pub status: Option<RecordStatus>,
}

#[derive(Debug, Clone, FromRow)]
struct Reseller {
    pub id: ResellerId,
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub domain: Option<String>,
    pub commission_percent: Decimal,
    pub status: RecordStatus,
    pub plan_id: Option<PlanId>,
    pub channels_enabled: serde_json::Value,
    pub payout_pending: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reseller> for ResellerDBResponse {
    fn from(r: Reseller) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            domain: r.domain,
            commission_percent: r.commission_percent,
            status: r.status,
            plan_id: r.plan_id,
            channels_enabled: decode_json_list("resellers.channels_enabled", r.channels_enabled),
            payout_pending: r.payout_pending,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub struct Resellers<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Resellers<'c> {
    type CreateRequest = ResellerCreateDBRequest;
    type UpdateRequest = ResellerUpdateDBRequest;
    type Response = ResellerDBResponse;
    type Id = ResellerId;
    type Filter = ResellerFilter;

    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let email = request.email.trim().to_lowercase();
        let user = Users::new(&mut tx)
            .create(&UserCreateDBRequest {
                name: request.name.clone(),
                email: email.clone(),
                password_hash: Some(request.password_hash.clone()),
                role: Role::Reseller,
                team_role: TeamRole::Admin,
                permissions: request.permissions.clone(),
                plan_id: request.plan_id,
                company: None,
                contact_phone: request.phone.clone(),
                channels_enabled: request.channels_enabled.clone(),
            })
            .await?;

        let reseller = sqlx::query_as::<_, Reseller>(
            r#"
            INSERT INTO resellers (id, user_id, name, email, phone, domain, commission_percent, plan_id, channels_enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.id)
        .bind(&request.name)
        .bind(&email)
        .bind(&request.phone)
        .bind(&request.domain)
        .bind(request.commission_percent)
        .bind(request.plan_id)
        .bind(encode_json_list(&request.channels_enabled))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ResellerDBResponse::from(reseller))
    }

    #[instrument(skip(self), fields(reseller_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let reseller = sqlx::query_as::<_, Reseller>("SELECT * FROM resellers WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(reseller.map(ResellerDBResponse::from))
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let resellers = sqlx::query_as::<_, Reseller>(
            r#"
            SELECT * FROM resellers
            WHERE ($1::record_status IS NULL OR status = $1)
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(filter.status)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(resellers.into_iter().map(ResellerDBResponse::from).collect())
    }

    /// Resellers are deactivated through `status`, never removed, since the paired user stays.
    #[instrument(skip(self), fields(reseller_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        Err(DbError::ProtectedEntity {
            operation: "delete",
            reason: "set status to inactive instead".to_string(),
            entity_type: "reseller",
            entity_id: Some(id.to_string()),
        })
    }

    #[instrument(skip(self, request), fields(reseller_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let channels = request.channels_enabled.as_deref().map(encode_json_list::<Channel>);
        let reseller = sqlx::query_as::<_, Reseller>(
            r#"
            UPDATE resellers SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = CASE WHEN $4 THEN $5 ELSE phone END,
                domain = CASE WHEN $6 THEN $7 ELSE domain END,
                commission_percent = COALESCE($8, commission_percent),
                status = COALESCE($9, status),
                plan_id = CASE WHEN $10 THEN $11 ELSE plan_id END,
                channels_enabled = COALESCE($12, channels_enabled),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(request.phone.is_some())
        .bind(request.phone.as_ref().and_then(|p| p.as_deref()))
        .bind(request.domain.is_some())
        .bind(request.domain.as_ref().and_then(|d| d.as_deref()))
        .bind(request.commission_percent)
        .bind(request.status)
        .bind(request.plan_id.is_some())
        .bind(request.plan_id.flatten())
        .bind(channels)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if request.name.is_some() || request.email.is_some() {
            Users::new(&mut tx)
                .update(
                    reseller.user_id,
                    &UserUpdateDBRequest {
                        name: request.name.clone(),
                        email: request.email.clone(),
                        ..Default::default()
                    },
                )
                .await?;
        }

        tx.commit().await?;
        Ok(ResellerDBResponse::from(reseller))
    }
}

impl<'c> Resellers<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::{PermissionSet, TenantClass};
    use sqlx::PgPool;

    fn create_request(email: &str) -> ResellerCreateDBRequest {
        ResellerCreateDBRequest {
            name: "Acme Resale".to_string(),
            email: email.to_string(),
            phone: Some("+15550100".to_string()),
            domain: Some("acme.example.com".to_string()),
            commission_percent: Decimal::new(125, 1),
            plan_id: None,
            channels_enabled: vec![Channel::Sms],
            password_hash: "$argon2id$placeholder".to_string(),
            permissions: PermissionSet::default_for(TenantClass::Reseller).to_entries(),
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_pairs_exactly_one_reseller_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let reseller = Resellers::new(&mut conn).create(&create_request("acme@example.com")).await.unwrap();

        let users: Vec<(UserId, Role)> = sqlx::query_as("SELECT id, role FROM users WHERE email = 'acme@example.com'")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(users, vec![(reseller.user_id, Role::Reseller)]);

        let user = Users::new(&mut conn).get_by_id(reseller.user_id).await.unwrap().unwrap();
        assert_eq!(user.permissions.len(), crate::auth::permissions::RESELLER_PERMISSIONS.len());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_rolls_back_the_pair(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        Resellers::new(&mut conn).create(&create_request("dup@example.com")).await.unwrap();

        let err = Resellers::new(&mut conn).create(&create_request("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&pool).await.unwrap();
        let resellers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resellers").fetch_one(&pool).await.unwrap();
        assert_eq!((users, resellers), (1, 1));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_status_only_update_leaves_other_columns(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Resellers::new(&mut conn);
        let created = repo.create(&create_request("status@example.com")).await.unwrap();

        let updated = repo
            .update(
                created.id,
                &ResellerUpdateDBRequest {
                    status: Some(RecordStatus::Inactive),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, RecordStatus::Inactive);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.email, created.email);
        assert_eq!(updated.phone, created.phone);
        assert_eq!(updated.domain, created.domain);
        assert_eq!(updated.commission_percent, created.commission_percent);
        assert_eq!(updated.plan_id, created.plan_id);
        assert_eq!(updated.channels_enabled, created.channels_enabled);
        assert_eq!(updated.payout_pending, created.payout_pending);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_explicit_none_clears_nullable_columns(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Resellers::new(&mut conn);
        let created = repo.create(&create_request("clear@example.com")).await.unwrap();

        let updated = repo
            .update(
                created.id,
                &ResellerUpdateDBRequest {
                    phone: Some(None),
                    plan_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.phone, None);
        assert_eq!(updated.plan_id, None);
        assert_eq!(updated.domain, created.domain);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_email_change_is_mirrored_to_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let created = Resellers::new(&mut conn).create(&create_request("old@example.com")).await.unwrap();

        Resellers::new(&mut conn)
            .update(
                created.id,
                &ResellerUpdateDBRequest {
                    email: Some("new@example.com".to_string()),
                    name: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let user = Users::new(&mut conn).get_by_id(created.user_id).await.unwrap().unwrap();
        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.name, "Renamed");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_unknown_is_not_found(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let result = Resellers::new(&mut conn)
            .update(Uuid::new_v4(), &ResellerUpdateDBRequest::default())
            .await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }
}
