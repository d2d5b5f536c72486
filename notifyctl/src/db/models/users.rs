//! Database models for users.

use super::trim_patch;
use crate::api::models::common::Channel;
use crate::api::models::users::{ProfileUpdate, Role, TeamRole};
use crate::auth::permissions::PermissionEntry;
use crate::types::{PlanId, UserId};
use chrono::{DateTime, Utc};

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub team_role: TeamRole,
    pub permissions: Vec<PermissionEntry>,
    pub plan_id: Option<PlanId>,
    pub company: Option<String>,
    pub contact_phone: Option<String>,
    pub channels_enabled: Vec<Channel>,
}

/// Database request for updating a user. `None` leaves the column unchanged; `Some(None)`
/// clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub company: Option<Option<String>>,
    pub contact_phone: Option<Option<String>>,
    pub channels_enabled: Option<Vec<Channel>>,
}

impl From<ProfileUpdate> for UserUpdateDBRequest {
    fn from(update: ProfileUpdate) -> Self {
        Self {
            name: update.name.map(|n| n.trim().to_string()),
            email: None, // email changes only happen through reseller sync
            company: trim_patch(update.company),
            contact_phone: trim_patch(update.contact_phone),
            channels_enabled: update.channels_enabled,
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone)]
pub struct UserDBResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub team_role: TeamRole,
    pub permissions: Vec<PermissionEntry>,
    pub plan_id: Option<PlanId>,
    pub company: Option<String>,
    pub contact_phone: Option<String>,
    pub channels_enabled: Vec<Channel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}
