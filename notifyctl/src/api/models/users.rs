//! API request/response models for users, authentication and profiles.

use super::{common::Channel, pagination::Pagination};
use crate::api::validation::{Validate, Validator};
use crate::auth::permissions::{Feature, PermissionEntry, TenantClass};
use crate::db::models::users::UserDBResponse;
use crate::types::{PlanId, UserId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Global account role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Reseller,
}

/// Sub-role within a tenant; selects which column of a permission entry applies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "team_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Admin,
    Manager,
    Agent,
}

/// Identity decoded from a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl From<&UserDBResponse> for CurrentUser {
    fn from(user: &UserDBResponse) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self, v: &mut Validator) {
        v.check(!self.email.trim().is_empty(), "email", "is required")
            .check(!self.password.is_empty(), "password", "is required");
    }
}

/// Password length bounds are configurable and checked by the handler.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub company: Option<String>,
    pub contact_phone: Option<String>,
}

impl Validate for SignupRequest {
    fn validate(&self, v: &mut Validator) {
        v.length("name", &self.name, 2, 100)
            .email("email", &self.email)
            .optional_length("company", self.company.as_deref(), 1, 200)
            .optional_length("contact_phone", self.contact_phone.as_deref(), 5, 32);
    }
}

/// Returned by login and signup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl Validate for ChangePasswordRequest {
    fn validate(&self, v: &mut Validator) {
        v.check(!self.current_password.is_empty(), "current_password", "is required");
    }
}

/// Profile fields a user may change themselves. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    /// `null` clears the stored value
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub company: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option", skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub contact_phone: Option<Option<String>>,
    pub channels_enabled: Option<Vec<Channel>>,
}

impl Validate for ProfileUpdate {
    fn validate(&self, v: &mut Validator) {
        v.optional_length("name", self.name.as_deref(), 2, 100)
            .patch_length("company", &self.company, 1, 200)
            .patch_length("contact_phone", &self.contact_phone, 5, 32);
        if let Some(channels) = &self.channels_enabled {
            v.unique("channels_enabled", channels);
        }
    }
}

/// Replace a user's team role and permission array.
///
/// Entries are checked against the target user's tenant catalog in the handler.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionsUpdate {
    pub team_role: Option<TeamRole>,
    pub permissions: Vec<PermissionEntry>,
}

impl Validate for PermissionsUpdate {
    fn validate(&self, v: &mut Validator) {
        for (i, entry) in self.permissions.iter().enumerate() {
            v.check(!entry.feature.trim().is_empty(), &format!("permissions[{i}].feature"), "is required");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub team_role: TeamRole,
    pub permissions: Vec<PermissionEntry>,
    #[schema(value_type = Option<String>, format = "uuid")]
    pub plan_id: Option<PlanId>,
    pub company: Option<String>,
    pub contact_phone: Option<String>,
    pub channels_enabled: Vec<Channel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            name: db.name,
            email: db.email,
            role: db.role,
            team_role: db.team_role,
            permissions: db.permissions,
            plan_id: db.plan_id,
            company: db.company,
            contact_phone: db.contact_phone,
            channels_enabled: db.channels_enabled,
            created_at: db.created_at,
            updated_at: db.updated_at,
            last_login: db.last_login,
        }
    }
}

/// The caller's own record with computed wallet figures.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    #[schema(value_type = String)]
    pub credits_available: Decimal,
    #[schema(value_type = String)]
    pub credits_used: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ListUsersQuery {
    #[serde(flatten)]
    #[param(inline)]
    pub pagination: Pagination,
    /// Only return users with this global role
    pub role: Option<Role>,
}

/// One tenant catalog in `GET /permissions/catalog`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionCatalog {
    pub tenant_class: TenantClass,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionCatalogResponse {
    pub catalogs: Vec<PermissionCatalog>,
}
