//! Database models for RCS bots and their contact/media children.

use crate::api::models::rcs_bots::{
    RcsBotContact, RcsBotCreate, RcsBotMedia, RcsBotStatus, RcsBotType, RcsBotUpdate, RcsContactKind, RcsMediaKind, RcsMessageType,
};
use super::{trim_patch, trim_text};
use crate::types::{RcsBotId, UserId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct RcsBotCreateDBRequest {
    pub user_id: UserId,
    pub name: String,
    pub brand_name: String,
    pub description: Option<String>,
    pub brand_color: Option<String>,
    pub bot_type: RcsBotType,
    pub message_type: RcsMessageType,
    pub contacts: Vec<RcsBotContact>,
    pub media: Vec<RcsBotMedia>,
}

impl RcsBotCreateDBRequest {
    pub fn new(user_id: UserId, api: RcsBotCreate) -> Self {
        Self {
            user_id,
            name: api.name.trim().to_string(),
            brand_name: api.brand_name.trim().to_string(),
            description: trim_text(api.description),
            brand_color: trim_text(api.brand_color),
            bot_type: api.bot_type,
            message_type: api.message_type,
            contacts: trim_contacts(api.contacts),
            media: trim_media(api.media),
        }
    }
}

/// `None` leaves a column or child set unchanged; `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct RcsBotUpdateDBRequest {
    pub name: Option<String>,
    pub brand_name: Option<String>,
    pub description: Option<Option<String>>,
    pub brand_color: Option<Option<String>>,
    pub bot_type: Option<RcsBotType>,
    pub message_type: Option<RcsMessageType>,
    pub status: Option<RcsBotStatus>,
    pub contacts: Option<Vec<RcsBotContact>>,
    pub media: Option<Vec<RcsBotMedia>>,
}

impl From<RcsBotUpdate> for RcsBotUpdateDBRequest {
    fn from(api: RcsBotUpdate) -> Self {
        Self {
            name: api.name.map(|n| n.trim().to_string()),
            brand_name: api.brand_name.map(|n| n.trim().to_string()),
            description: trim_patch(api.description),
            brand_color: trim_patch(api.brand_color),
            bot_type: api.bot_type,
            message_type: api.message_type,
            status: api.status,
            contacts: api.contacts.map(trim_contacts),
            media: api.media.map(trim_media),
        }
    }
}

fn trim_contacts(contacts: Vec<RcsBotContact>) -> Vec<RcsBotContact> {
    contacts
        .into_iter()
        .map(|c| RcsBotContact {
            kind: c.kind,
            value: c.value.trim().to_string(),
            label: trim_text(c.label),
        })
        .collect()
}

fn trim_media(media: Vec<RcsBotMedia>) -> Vec<RcsBotMedia> {
    media
        .into_iter()
        .map(|m| RcsBotMedia {
            kind: m.kind,
            url: m.url.trim().to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcsBotContactDBResponse {
    pub kind: RcsContactKind,
    pub value: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcsBotMediaDBResponse {
    pub kind: RcsMediaKind,
    pub url: String,
}

/// A bot together with its children, each in insertion order.
#[derive(Debug, Clone)]
pub struct RcsBotDBResponse {
    pub id: RcsBotId,
    pub user_id: UserId,
    pub name: String,
    pub brand_name: String,
    pub description: Option<String>,
    pub brand_color: Option<String>,
    pub bot_type: RcsBotType,
    pub message_type: RcsMessageType,
    pub status: RcsBotStatus,
    pub contacts: Vec<RcsBotContactDBResponse>,
    pub media: Vec<RcsBotMediaDBResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
