//! API request/response models for RCS bot configurations.

use super::pagination::Pagination;
use crate::api::validation::{Validate, Validator};
use crate::db::models::rcs_bots::{RcsBotContactDBResponse, RcsBotDBResponse, RcsBotMediaDBResponse};
use crate::types::{RcsBotId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "rcs_bot_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RcsBotStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "rcs_bot_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RcsBotType {
    Domestic,
    International,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "rcs_message_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RcsMessageType {
    Otp,
    Transactional,
    Promotional,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "rcs_contact_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RcsContactKind {
    Phone,
    Email,
    Website,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "rcs_media_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RcsMediaKind {
    Logo,
    Banner,
}

/// A contact point shown on the bot's profile card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RcsBotContact {
    pub kind: RcsContactKind,
    pub value: String,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RcsBotMedia {
    pub kind: RcsMediaKind,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RcsBotCreate {
    pub name: String,
    pub brand_name: String,
    pub description: Option<String>,
    /// `#RRGGBB`
    pub brand_color: Option<String>,
    pub bot_type: RcsBotType,
    pub message_type: RcsMessageType,
    #[serde(default)]
    pub contacts: Vec<RcsBotContact>,
    #[serde(default)]
    pub media: Vec<RcsBotMedia>,
}

impl Validate for RcsBotCreate {
    fn validate(&self, v: &mut Validator) {
        v.length("name", &self.name, 2, 100)
            .length("brand_name", &self.brand_name, 1, 100)
            .optional_length("description", self.description.as_deref(), 0, 2000);
        if let Some(color) = &self.brand_color {
            v.check(is_hex_color(color.trim()), "brand_color", "must be a hex color like #1A2B3C");
        }
        validate_children(v, &self.contacts, &self.media);
    }
}

/// Partial update. A supplied `contacts` or `media` list replaces the stored set, and `null`
/// clears `description` or `brand_color`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RcsBotUpdate {
    pub name: Option<String>,
    pub brand_name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub brand_color: Option<Option<String>>,
    pub bot_type: Option<RcsBotType>,
    pub message_type: Option<RcsMessageType>,
    pub status: Option<RcsBotStatus>,
    pub contacts: Option<Vec<RcsBotContact>>,
    pub media: Option<Vec<RcsBotMedia>>,
}

impl Validate for RcsBotUpdate {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("name", self.name.as_deref(), 2, 100)
            .optional_length("brand_name", self.brand_name.as_deref(), 1, 100)
            .patch_length("description", &self.description, 0, 2000);
        if let Some(Some(color)) = &self.brand_color {
            v.check(is_hex_color(color.trim()), "brand_color", "must be a hex color like #1A2B3C");
        }
        validate_children(
            v,
            self.contacts.as_deref().unwrap_or_default(),
            self.media.as_deref().unwrap_or_default(),
        );
    }
}

fn validate_children(v: &mut Validator, contacts: &[RcsBotContact], media: &[RcsBotMedia]) {
    for (i, contact) in contacts.iter().enumerate() {
        v.length(&format!("contacts[{i}].value"), &contact.value, 1, 255)
            .optional_length(&format!("contacts[{i}].label"), contact.label.as_deref(), 0, 100);
    }
    for (i, item) in media.iter().enumerate() {
        v.length(&format!("media[{i}].url"), &item.url, 1, 2048);
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RcsBotResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: RcsBotId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub name: String,
    pub brand_name: String,
    pub description: Option<String>,
    pub brand_color: Option<String>,
    pub bot_type: RcsBotType,
    pub message_type: RcsMessageType,
    pub status: RcsBotStatus,
    pub contacts: Vec<RcsBotContact>,
    pub media: Vec<RcsBotMedia>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RcsBotContactDBResponse> for RcsBotContact {
    fn from(db: RcsBotContactDBResponse) -> Self {
        Self {
            kind: db.kind,
            value: db.value,
            label: db.label,
        }
    }
}

impl From<RcsBotMediaDBResponse> for RcsBotMedia {
    fn from(db: RcsBotMediaDBResponse) -> Self {
        Self { kind: db.kind, url: db.url }
    }
}

impl From<RcsBotDBResponse> for RcsBotResponse {
    fn from(db: RcsBotDBResponse) -> Self {
        Self {
            id: db.id,
            user_id: db.user_id,
            name: db.name,
            brand_name: db.brand_name,
            description: db.description,
            brand_color: db.brand_color,
            bot_type: db.bot_type,
            message_type: db.message_type,
            status: db.status,
            contacts: db.contacts.into_iter().map(Into::into).collect(),
            media: db.media.into_iter().map(Into::into).collect(),
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RcsBotListResponse {
    pub bots: Vec<RcsBotResponse>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListRcsBotsQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
    pub status: Option<RcsBotStatus>,
}
