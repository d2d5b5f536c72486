//! API request/response models for vendors and vendor-user mappings.

use super::common::{Channel, RecordStatus};
use crate::api::validation::{Validate, Validator};
use crate::db::models::vendors::{VendorDBResponse, VendorMappingDBResponse};
use crate::types::{UserId, VendorId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Returned in place of a stored API key.
pub const API_KEY_MASK: &str = "********";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorCreate {
    pub name: String,
    #[serde(rename = "type")]
    pub vendor_type: String,
    pub api_url: String,
    pub api_key: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl Validate for VendorCreate {
    fn validate(&self, v: &mut Validator) {
        v.length("name", &self.name, 2, 100)
            .length("type", &self.vendor_type, 1, 50)
            .check(is_http_url(&self.api_url), "api_url", "must be an http(s) URL")
            .min("priority", self.priority, 0)
            .unique("channels", &self.channels);
    }
}

/// Partial vendor update. Omitting `api_key` keeps the stored key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct VendorUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub vendor_type: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub priority: Option<i32>,
    pub channels: Option<Vec<Channel>>,
    pub status: Option<RecordStatus>,
}

impl Validate for VendorUpdate {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("name", self.name.as_deref(), 2, 100)
            .optional_length("type", self.vendor_type.as_deref(), 1, 50)
            .optional_min("priority", self.priority, 0);
        if let Some(url) = &self.api_url {
            v.check(is_http_url(url), "api_url", "must be an http(s) URL");
        }
        if let Some(channels) = &self.channels {
            v.unique("channels", channels);
        }
    }
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value.trim()).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: VendorId,
    pub name: String,
    #[serde(rename = "type")]
    pub vendor_type: String,
    pub api_url: String,
    /// `null` when no key is stored, otherwise the fixed mask
    pub api_key: Option<String>,
    pub priority: i32,
    pub channels: Vec<Channel>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VendorDBResponse> for VendorResponse {
    fn from(db: VendorDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            vendor_type: db.vendor_type,
            api_url: db.api_url,
            api_key: db.has_api_key.then(|| API_KEY_MASK.to_string()),
            priority: db.priority,
            channels: db.channels,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorListResponse {
    pub vendors: Vec<VendorResponse>,
}

/// Replace every mapping of `vendor_id` with `user_ids`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorMappingsReplace {
    #[schema(value_type = String, format = "uuid")]
    pub vendor_id: VendorId,
    #[schema(value_type = Vec<String>)]
    pub user_ids: Vec<UserId>,
}

const MAX_MAPPED_USERS: usize = 10_000;

impl Validate for VendorMappingsReplace {
    fn validate(&self, v: &mut Validator) {
        v.check(
            self.user_ids.len() <= MAX_MAPPED_USERS,
            "user_ids",
            format!("must not contain more than {MAX_MAPPED_USERS} entries"),
        );
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListMappingsQuery {
    /// Only return mappings for this vendor
    #[param(value_type = Option<String>, format = "uuid")]
    pub vendor_id: Option<VendorId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorMappingResponse {
    #[schema(value_type = String, format = "uuid")]
    pub vendor_id: VendorId,
    #[schema(value_type = String, format = "uuid")]
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl From<VendorMappingDBResponse> for VendorMappingResponse {
    fn from(db: VendorMappingDBResponse) -> Self {
        Self {
            vendor_id: db.vendor_id,
            user_id: db.user_id,
            created_at: db.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VendorMappingListResponse {
    pub mappings: Vec<VendorMappingResponse>,
}
