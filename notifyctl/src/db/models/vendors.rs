//! Database models for vendors and vendor-user mappings.

use crate::api::models::common::{Channel, RecordStatus};
use crate::api::models::vendors::{VendorCreate, VendorUpdate};
use crate::types::{UserId, VendorId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct VendorCreateDBRequest {
    pub name: String,
    pub vendor_type: String,
    pub api_url: String,
    pub api_key: Option<String>,
    pub priority: i32,
    pub channels: Vec<Channel>,
}

impl From<VendorCreate> for VendorCreateDBRequest {
    fn from(api: VendorCreate) -> Self {
        Self {
            name: api.name.trim().to_string(),
            vendor_type: api.vendor_type.trim().to_string(),
            api_url: api.api_url.trim().to_string(),
            api_key: api.api_key.filter(|k| !k.is_empty()),
            priority: api.priority,
            channels: api.channels,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VendorUpdateDBRequest {
    pub name: Option<String>,
    pub vendor_type: Option<String>,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub priority: Option<i32>,
    pub channels: Option<Vec<Channel>>,
    pub status: Option<RecordStatus>,
}

impl From<VendorUpdate> for VendorUpdateDBRequest {
    fn from(api: VendorUpdate) -> Self {
        Self {
            name: api.name.map(|n| n.trim().to_string()),
            vendor_type: api.vendor_type.map(|t| t.trim().to_string()),
            api_url: api.api_url.map(|u| u.trim().to_string()),
            api_key: api.api_key.filter(|k| !k.is_empty()),
            priority: api.priority,
            channels: api.channels,
            status: api.status,
        }
    }
}

/// The stored key never leaves the database; only its presence does.
#[derive(Debug, Clone)]
pub struct VendorDBResponse {
    pub id: VendorId,
    pub name: String,
    pub vendor_type: String,
    pub api_url: String,
    pub has_api_key: bool,
    pub priority: i32,
    pub channels: Vec<Channel>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct VendorMappingDBResponse {
    pub vendor_id: VendorId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}
