//! Database repository for RCS bots.
//!
//! A bot owns two child tables (`rcs_bot_contacts`, `rcs_bot_media`). Writes touching a bot and
//! its children run in one transaction, so a failed child insert leaves no partial bot behind.

use crate::{
    api::models::rcs_bots::{
        RcsBotContact, RcsBotMedia, RcsBotStatus, RcsBotType, RcsContactKind, RcsMediaKind, RcsMessageType,
    },
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
        models::rcs_bots::{
            RcsBotContactDBResponse, RcsBotCreateDBRequest, RcsBotDBResponse, RcsBotMediaDBResponse, RcsBotUpdateDBRequest,
        },
    },
    types::{RcsBotId, TenantScope, UserId, abbrev_uuid},
};
use chrono::{DateTime, Utc};
use sqlx::{Connection, FromRow, PgConnection};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Filter for listing bots
#[derive(Debug, Clone)]
pub struct RcsBotFilter {
    pub status: Option<RcsBotStatus>,
    pub skip: i64,
    pub limit: i64,
}

impl RcsBotFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { status: None, skip, limit }
    }
}

#[derive(Debug, Clone, FromRow)]
struct RcsBot {
    pub id: RcsBotId,
    pub user_id: UserId,
    pub name: String,
    pub brand_name: String,
    pub description: Option<String>,
    pub brand_color: Option<String>,
    pub bot_type: RcsBotType,
    pub message_type: RcsMessageType,
    pub status: RcsBotStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct Contact {
    pub bot_id: RcsBotId,
    pub kind: RcsContactKind,
    pub value: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct Media {
    pub bot_id: RcsBotId,
    pub kind: RcsMediaKind,
    pub url: String,
}

fn assemble(bot: RcsBot, contacts: Vec<RcsBotContactDBResponse>, media: Vec<RcsBotMediaDBResponse>) -> RcsBotDBResponse {
    RcsBotDBResponse {
        id: bot.id,
        user_id: bot.user_id,
        name: bot.name,
        brand_name: bot.brand_name,
        description: bot.description,
        brand_color: bot.brand_color,
        bot_type: bot.bot_type,
        message_type: bot.message_type,
        status: bot.status,
        contacts,
        media,
        created_at: bot.created_at,
        updated_at: bot.updated_at,
    }
}

/// Bots repository, restricted to one tenant's rows unless the scope is [`TenantScope::All`].
pub struct RcsBots<'c> {
    db: &'c mut PgConnection,
    scope: TenantScope,
}

#[async_trait::async_trait]
impl<'c> Repository for RcsBots<'c> {
    type CreateRequest = RcsBotCreateDBRequest;
    type UpdateRequest = RcsBotUpdateDBRequest;
    type Response = RcsBotDBResponse;
    type Id = RcsBotId;
    type Filter = RcsBotFilter;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&request.user_id), contacts = request.contacts.len(), media = request.media.len()), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let bot = sqlx::query_as::<_, RcsBot>(
            r#"
            INSERT INTO rcs_bots (id, user_id, name, brand_name, description, brand_color, bot_type, message_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.name)
        .bind(&request.brand_name)
        .bind(&request.description)
        .bind(&request.brand_color)
        .bind(request.bot_type)
        .bind(request.message_type)
        .fetch_one(&mut *tx)
        .await?;

        insert_contacts(&mut tx, bot.id, &request.contacts).await?;
        insert_media(&mut tx, bot.id, &request.media).await?;
        let (contacts, media) = load_children(&mut tx, bot.id).await?;

        tx.commit().await?;
        Ok(assemble(bot, contacts, media))
    }

    #[instrument(skip(self), fields(bot_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let Some(bot) = sqlx::query_as::<_, RcsBot>("SELECT * FROM rcs_bots WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id)
            .bind(self.scope.owner())
            .fetch_optional(&mut *self.db)
            .await?
        else {
            return Ok(None);
        };

        let (contacts, media) = load_children(&mut *self.db, bot.id).await?;
        Ok(Some(assemble(bot, contacts, media)))
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let bots = sqlx::query_as::<_, RcsBot>(
            r#"
            SELECT * FROM rcs_bots
            WHERE ($1::uuid IS NULL OR user_id = $1)
              AND ($2::rcs_bot_status IS NULL OR status = $2)
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

        let ids: Vec<RcsBotId> = bots.iter().map(|b| b.id).collect();
        let mut contacts = group_by_bot(
            sqlx::query_as::<_, Contact>(
                "SELECT bot_id, kind, value, label FROM rcs_bot_contacts WHERE bot_id = ANY($1) ORDER BY position",
            )
            .bind(&ids)
            .fetch_all(&mut *self.db)
            .await?
            .into_iter()
            .map(|c| (c.bot_id, RcsBotContactDBResponse { kind: c.kind, value: c.value, label: c.label })),
        );
        let mut media = group_by_bot(
            sqlx::query_as::<_, Media>("SELECT bot_id, kind, url FROM rcs_bot_media WHERE bot_id = ANY($1) ORDER BY position")
                .bind(&ids)
                .fetch_all(&mut *self.db)
                .await?
                .into_iter()
                .map(|m| (m.bot_id, RcsBotMediaDBResponse { kind: m.kind, url: m.url })),
        );

        Ok(bots
            .into_iter()
            .map(|bot| {
                let c = contacts.remove(&bot.id).unwrap_or_default();
                let m = media.remove(&bot.id).unwrap_or_default();
                assemble(bot, c, m)
            })
            .collect())
    }

    /// Children go with the bot (`ON DELETE CASCADE`).
    #[instrument(skip(self), fields(bot_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rcs_bots WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)")
            .bind(id)
            .bind(self.scope.owner())
            .execute(&mut *self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(bot_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let bot = sqlx::query_as::<_, RcsBot>(
            r#"
            UPDATE rcs_bots SET
                name = COALESCE($3, name),
                brand_name = COALESCE($4, brand_name),
                description = CASE WHEN $5 THEN $6 ELSE description END,
                brand_color = CASE WHEN $7 THEN $8 ELSE brand_color END,
                bot_type = COALESCE($9, bot_type),
                message_type = COALESCE($10, message_type),
                status = COALESCE($11, status),
                updated_at = NOW()
            WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(self.scope.owner())
        .bind(&request.name)
        .bind(&request.brand_name)
        .bind(request.description.is_some())
        .bind(request.description.as_ref().and_then(|d| d.as_deref()))
        .bind(request.brand_color.is_some())
        .bind(request.brand_color.as_ref().and_then(|c| c.as_deref()))
        .bind(request.bot_type)
        .bind(request.message_type)
        .bind(request.status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if let Some(contacts) = &request.contacts {
            sqlx::query("DELETE FROM rcs_bot_contacts WHERE bot_id = $1")
                .bind(bot.id)
                .execute(&mut *tx)
                .await?;
            insert_contacts(&mut tx, bot.id, contacts).await?;
        }
        if let Some(media) = &request.media {
            sqlx::query("DELETE FROM rcs_bot_media WHERE bot_id = $1")
                .bind(bot.id)
                .execute(&mut *tx)
                .await?;
            insert_media(&mut tx, bot.id, media).await?;
        }

        let (contacts, media) = load_children(&mut tx, bot.id).await?;
        tx.commit().await?;
        Ok(assemble(bot, contacts, media))
    }
}

impl<'c> RcsBots<'c> {
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
    pub async fn count(&mut self, status: Option<RcsBotStatus>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rcs_bots WHERE ($1::uuid IS NULL OR user_id = $1) AND ($2::rcs_bot_status IS NULL OR status = $2)",
        )
        .bind(self.scope.owner())
        .bind(status)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(count)
    }
}

async fn insert_contacts(conn: &mut PgConnection, bot_id: RcsBotId, contacts: &[RcsBotContact]) -> Result<()> {
    for (position, contact) in contacts.iter().enumerate() {
        sqlx::query("INSERT INTO rcs_bot_contacts (id, bot_id, kind, value, label, position) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(Uuid::new_v4())
            .bind(bot_id)
            .bind(contact.kind)
            .bind(contact.value.trim())
            .bind(&contact.label)
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_media(conn: &mut PgConnection, bot_id: RcsBotId, media: &[RcsBotMedia]) -> Result<()> {
    for (position, item) in media.iter().enumerate() {
        sqlx::query("INSERT INTO rcs_bot_media (id, bot_id, kind, url, position) VALUES ($1, $2, $3, $4, $5)")
            .bind(Uuid::new_v4())
            .bind(bot_id)
            .bind(item.kind)
            .bind(item.url.trim())
            .bind(position as i32)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn load_children(conn: &mut PgConnection, bot_id: RcsBotId) -> Result<(Vec<RcsBotContactDBResponse>, Vec<RcsBotMediaDBResponse>)> {
    let contacts = sqlx::query_as::<_, Contact>(
        "SELECT bot_id, kind, value, label FROM rcs_bot_contacts WHERE bot_id = $1 ORDER BY position",
    )
    .bind(bot_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|c| RcsBotContactDBResponse {
        kind: c.kind,
        value: c.value,
        label: c.label,
    })
    .collect();

    let media = sqlx::query_as::<_, Media>("SELECT bot_id, kind, url FROM rcs_bot_media WHERE bot_id = $1 ORDER BY position")
        .bind(bot_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(|m| RcsBotMediaDBResponse { kind: m.kind, url: m.url })
        .collect();

    Ok((contacts, media))
}

fn group_by_bot<T>(rows: impl Iterator<Item = (RcsBotId, T)>) -> HashMap<RcsBotId, Vec<T>> {
    let mut grouped: HashMap<RcsBotId, Vec<T>> = HashMap::new();
    for (bot_id, row) in rows {
        grouped.entry(bot_id).or_default().push(row);
    }
    grouped
}
