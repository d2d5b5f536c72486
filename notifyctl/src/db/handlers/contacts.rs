//! Database repository for contacts.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::{
            contacts::{ContactCreateDBRequest, ContactDBResponse, ContactUpdateDBRequest},
            decode_json_list, encode_json_list,
        },
    },
    types::{ContactId, TenantScope, UserId, abbrev_uuid},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing contacts
#[derive(Debug, Clone)]
pub struct ContactFilter {
    /// Case-insensitive substring of name, phone or email
    pub search: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

impl ContactFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { search: None, skip, limit }
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        self
    }

    fn pattern(&self) -> Option<String> {
        self.search.as_deref().map(like_pattern)
    }
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Debug, Clone, FromRow)]
struct Contact {
    pub id: ContactId,
    pub user_id: UserId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub tags: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Contact> for ContactDBResponse {
    fn from(c: Contact) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            name: c.name,
            phone: c.phone,
            email: c.email,
            tags: decode_json_list("contacts.tags", c.tags),
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

pub struct Contacts<'c> {
    db: &'c mut PgConnection,
    scope: TenantScope,
}

#[async_trait::async_trait]
impl<'c> Repository for Contacts<'c> {
    type CreateRequest = ContactCreateDBRequest;
    type UpdateRequest = ContactUpdateDBRequest;
    type Response = ContactDBResponse;
    type Id = ContactId;
    type Filter = ContactFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (id, user_id, name, phone, email, tags)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.name)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(encode_json_list(&request.tags))
        .fetch_one(&mut *self.db)
        .await?;

        Ok(contact.into())
    }

    #[instrument(skip(self), fields(contact_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id)
            .bind(self.scope.owner())
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(contact.map(Into::into))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip, search = filter.search.is_some()), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let contacts = sqlx::query_as::<_, Contact>(
            r#"
            SELECT * FROM contacts
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR name ILIKE $2 OR phone ILIKE $2 OR email ILIKE $2)
            ORDER BY created_at DESC, id
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(self.scope.owner())
        .bind(filter.pattern())
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(contacts.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), fields(contact_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id)
            .bind(self.scope.owner())
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(contact_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let contact = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts SET
                name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                email = CASE WHEN $5 THEN $6 ELSE email END,
                tags = COALESCE($7, tags),
                updated_at = NOW()
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(self.scope.owner())
        .bind(&request.name)
        .bind(&request.phone)
        .bind(request.email.is_some())
        .bind(request.email.as_ref().and_then(|e| e.as_deref()))
        .bind(request.tags.as_deref().map(encode_json_list))
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(contact.into())
    }
}

impl<'c> Contacts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self {
            db,
            scope: TenantScope::All,
        }
    }

    pub fn scoped(db: &'c mut PgConnection, scope: TenantScope) -> Self {
        Self { db, scope }
    }

    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &ContactFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM contacts
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR name ILIKE $2 OR phone ILIKE $2 OR email ILIKE $2)
            "#,
        )
        .bind(self.scope.owner())
        .bind(filter.pattern())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }
}
