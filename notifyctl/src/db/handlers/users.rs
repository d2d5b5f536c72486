//! Database repository for users.

use crate::types::{UserId, abbrev_uuid};
use crate::{
    api::models::{
        common::Channel,
        users::{Role, TeamRole},
    },
    auth::permissions::PermissionEntry,
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::{
            decode_json_list, encode_json_list,
            users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
        },
    },
    types::PlanId,
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing users
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit, role: None }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub team_role: TeamRole,
    pub permissions: serde_json::Value,
    pub plan_id: Option<PlanId>,
    pub company: Option<String>,
    pub contact_phone: Option<String>,
    pub channels_enabled: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserDBResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            team_role: user.team_role,
            permissions: decode_json_list("users.permissions", user.permissions),
            plan_id: user.plan_id,
            company: user.company,
            contact_phone: user.contact_phone,
            channels_enabled: decode_json_list("users.channels_enabled", user.channels_enabled),
            created_at: user.created_at,
            updated_at: user.updated_at,
            last_login: user.last_login,
        }
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(role = ?request.role), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, team_role, permissions, plan_id, company, contact_phone, channels_enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.name)
        .bind(request.email.trim().to_lowercase())
        .bind(&request.password_hash)
        .bind(request.role)
        .bind(request.team_role)
        .bind(encode_json_list(&request.permissions))
        .bind(request.plan_id)
        .bind(&request.company)
        .bind(&request.contact_phone)
        .bind(encode_json_list(&request.channels_enabled))
        .fetch_one(&mut *self.db)
        .await?;

        Ok(UserDBResponse::from(user))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter.role)
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(users.into_iter().map(UserDBResponse::from).collect())
    }

    /// Users are never hard-deleted.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        Err(DbError::ProtectedEntity {
            operation: "delete",
            reason: "users are never hard-deleted".to_string(),
            entity_type: "user",
            entity_id: Some(id.to_string()),
        })
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let channels = request.channels_enabled.as_deref().map(encode_json_list::<Channel>);

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                company = CASE WHEN $4 THEN $5 ELSE company END,
                contact_phone = CASE WHEN $6 THEN $7 ELSE contact_phone END,
                channels_enabled = COALESCE($8, channels_enabled),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&request.name)
        .bind(request.email.as_deref().map(|e| e.trim().to_lowercase()))
        .bind(request.company.is_some())
        .bind(request.company.as_ref().and_then(|c| c.as_deref()))
        .bind(request.contact_phone.is_some())
        .bind(request.contact_phone.as_ref().and_then(|p| p.as_deref()))
        .bind(channels)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(UserDBResponse::from(user))
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user.map(UserDBResponse::from))
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &UserFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::user_role IS NULL OR role = $1)")
            .bind(filter.role)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(count)
    }

    #[instrument(skip(self, password_hash), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn set_password_hash(&mut self, id: UserId, password_hash: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&mut *self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Replace the permission array, and optionally the team role.
    #[instrument(skip(self, permissions), fields(user_id = %abbrev_uuid(&id), count = permissions.len()), err)]
    pub async fn set_permissions(
        &mut self,
        id: UserId,
        team_role: Option<TeamRole>,
        permissions: &[PermissionEntry],
    ) -> Result<UserDBResponse> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                team_role = COALESCE($2, team_role),
                permissions = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(team_role)
        .bind(encode_json_list(permissions))
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(UserDBResponse::from(user))
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&id)), err)]
    pub async fn touch_last_login(&mut self, id: UserId) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::{PermissionSet, TenantClass};
    use sqlx::PgPool;

    fn create_request(email: &str) -> UserCreateDBRequest {
        UserCreateDBRequest {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: None,
            role: Role::User,
            team_role: TeamRole::Admin,
            permissions: PermissionSet::default_for(TenantClass::User).to_entries(),
            plan_id: None,
            company: Some("Acme".to_string()),
            contact_phone: None,
            channels_enabled: vec![Channel::Sms, Channel::Email],
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request(" Test@Example.com ")).await.unwrap();
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.team_role, TeamRole::Admin);
        assert_eq!(user.channels_enabled, vec![Channel::Sms, Channel::Email]);
        assert_eq!(user.permissions.len(), crate::auth::permissions::USER_PERMISSIONS.len());
        assert!(user.last_login.is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_is_unique_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("dup@example.com")).await.unwrap();
        let err = repo.create(&create_request("DUP@example.com")).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref constraint, .. } if constraint.as_deref() == Some("users_email_unique")
        ));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_user_by_email_is_case_insensitive(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("email@example.com")).await.unwrap();
        let found = repo.get_user_by_email("EMAIL@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.get_user_by_email("missing@example.com").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_partial_update_keeps_other_fields(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("partial@example.com")).await.unwrap();
        let updated = repo
            .update(
                created.id,
                &UserUpdateDBRequest {
                    contact_phone: Some(Some("+15550100".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.contact_phone.as_deref(), Some("+15550100"));
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.company, created.company);
        assert_eq!(updated.channels_enabled, created.channels_enabled);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_malformed_stored_lists_decode_as_empty(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let created = Users::new(&mut conn).create(&create_request("bad@example.com")).await.unwrap();

        sqlx::query("UPDATE users SET channels_enabled = '[\"sms\", 42]'::jsonb, permissions = '[{\"nope\": 1}]'::jsonb WHERE id = $1")
            .bind(created.id)
            .execute(&mut *conn)
            .await
            .unwrap();

        let user = Users::new(&mut conn).get_by_id(created.id).await.unwrap().unwrap();
        assert!(user.channels_enabled.is_empty());
        assert!(user.permissions.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_users_cannot_be_deleted(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let created = repo.create(&create_request("keep@example.com")).await.unwrap();
        assert!(matches!(repo.delete(created.id).await, Err(DbError::ProtectedEntity { .. })));
        assert!(repo.get_by_id(created.id).await.unwrap().is_some());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_filters_by_role(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("a@example.com")).await.unwrap();
        let mut reseller = create_request("b@example.com");
        reseller.role = Role::Reseller;
        repo.create(&reseller).await.unwrap();

        let filter = UserFilter::new(0, 10).with_role(Role::Reseller);
        let resellers = repo.list(&filter).await.unwrap();
        assert_eq!(resellers.len(), 1);
        assert_eq!(resellers[0].email, "b@example.com");
        assert_eq!(repo.count(&filter).await.unwrap(), 1);
        assert_eq!(repo.count(&UserFilter::new(0, 10)).await.unwrap(), 2);
    }
}
