//! Feature-permission catalog and evaluation.
//!
//! Every tenant class (regular user organisations and resellers) has a fixed catalog of
//! [`Feature`]s. A user's stored permission array grants each feature independently to the three
//! team roles (admin / manager / agent). Evaluation is:
//!
//! 1. global role `admin` (platform owner): always allowed
//! 2. feature missing from the user's [`PermissionSet`]: denied
//! 3. otherwise: the flag for the user's [`TeamRole`]
//!
//! Platform features (plans, resellers, vendors, wallet adjustments, user management) are in no
//! tenant catalog, so step 3 can never grant them.
//!
//! Handlers declare their requirement with the [`RequiresPermission`] extractor:
//!
//! ```ignore
//! async fn create_plan(
//!     State(state): State<AppState>,
//!     _: RequiresPermission<feature::PlansManage>,
//!     ValidatedJson(body): ValidatedJson<PlanCreate>,
//! ) -> Result<...>
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use utoipa::ToSchema;

use crate::{
    AppState,
    api::models::users::{CurrentUser, Role, TeamRole},
    db::handlers::{Repository, Users},
    errors::{Error, FieldError, Result},
    types::{TenantScope, UserId, abbrev_uuid},
};

macro_rules! features {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// A named capability that can be granted per team role.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
        pub enum Feature {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl Feature {
            pub const ALL: &'static [Feature] = &[$(Feature::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Feature::$variant => $name,)+
                }
            }
        }

        /// Type-level feature markers for [`RequiresPermission`].
        pub mod feature {
            $(
                pub struct $variant;

                impl super::FeatureMarker for $variant {
                    const FEATURE: super::Feature = super::Feature::$variant;
                }
            )+
        }
    };
}

features! {
    DashboardView => "Dashboard - View",
    ReportsView => "Reports - View",
    CampaignsView => "Campaigns - View",
    CampaignsCreate => "Campaigns - Create",
    CampaignsEdit => "Campaigns - Edit",
    CampaignsDelete => "Campaigns - Delete",
    TemplatesView => "Templates - View",
    TemplatesManage => "Templates - Manage",
    ContactsView => "Contacts - View",
    ContactsManage => "Contacts - Manage",
    RcsBotsView => "RCS Bots - View",
    RcsBotsManage => "RCS Bots - Manage",
    WalletView => "Wallet - View",
    ClientsView => "Clients - View",
    ClientsManage => "Clients - Manage",
    PlansManage => "Plans - Manage",
    ResellersManage => "Resellers - Manage",
    VendorsManage => "Vendors - Manage",
    WalletAdjust => "Wallet - Adjust",
    UsersManage => "Users - Manage",
}

impl Feature {
    pub fn parse(name: &str) -> Option<Feature> {
        Feature::ALL.iter().copied().find(|f| f.as_str() == name)
    }

    /// Read-only features are granted to agents in the default permission set.
    pub fn is_view(&self) -> bool {
        self.as_str().ends_with(" - View")
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog of features available to user-organisation tenants.
pub const USER_PERMISSIONS: &[Feature] = &[
    Feature::DashboardView,
    Feature::ReportsView,
    Feature::CampaignsView,
    Feature::CampaignsCreate,
    Feature::CampaignsEdit,
    Feature::CampaignsDelete,
    Feature::TemplatesView,
    Feature::TemplatesManage,
    Feature::ContactsView,
    Feature::ContactsManage,
    Feature::RcsBotsView,
    Feature::RcsBotsManage,
    Feature::WalletView,
];

/// Catalog of features available to reseller tenants.
pub const RESELLER_PERMISSIONS: &[Feature] = &[
    Feature::DashboardView,
    Feature::ReportsView,
    Feature::ClientsView,
    Feature::ClientsManage,
    Feature::WalletView,
];

/// Which permission catalog applies to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TenantClass {
    User,
    Reseller,
}

impl TenantClass {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Reseller => TenantClass::Reseller,
            Role::User | Role::Admin => TenantClass::User,
        }
    }

    pub fn catalog(&self) -> &'static [Feature] {
        match self {
            TenantClass::User => USER_PERMISSIONS,
            TenantClass::Reseller => RESELLER_PERMISSIONS,
        }
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.catalog().contains(&feature)
    }
}

/// Stored and wire shape of one permission entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionEntry {
    pub feature: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub manager: bool,
    #[serde(default)]
    pub agent: bool,
}

/// Per-team-role grants for a single feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Grants {
    pub admin: bool,
    pub manager: bool,
    pub agent: bool,
}

impl Grants {
    pub fn allows(&self, team_role: TeamRole) -> bool {
        match team_role {
            TeamRole::Admin => self.admin,
            TeamRole::Manager => self.manager,
            TeamRole::Agent => self.agent,
        }
    }
}

/// A user's effective permissions, keyed by catalog feature.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PermissionSet(BTreeMap<Feature, Grants>);

impl PermissionSet {
    /// Build from stored entries, dropping anything outside the tenant catalog.
    ///
    /// Dropped entries evaluate as "no access".
    pub fn from_stored(class: TenantClass, entries: &[PermissionEntry]) -> Self {
        let mut set = BTreeMap::new();
        for entry in entries {
            match Feature::parse(&entry.feature) {
                Some(feature) if class.contains(feature) => {
                    set.insert(
                        feature,
                        Grants {
                            admin: entry.admin,
                            manager: entry.manager,
                            agent: entry.agent,
                        },
                    );
                }
                _ => {
                    warn!(feature = %entry.feature, ?class, "Ignoring permission entry outside the catalog");
                }
            }
        }
        Self(set)
    }

    /// Build from a client-supplied array, rejecting unknown or duplicate features.
    pub fn try_from_request(class: TenantClass, entries: &[PermissionEntry]) -> std::result::Result<Self, Vec<FieldError>> {
        let mut set = BTreeMap::new();
        let mut errors = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            let field = format!("permissions[{index}].feature");
            match Feature::parse(&entry.feature) {
                Some(feature) if class.contains(feature) => {
                    let grants = Grants {
                        admin: entry.admin,
                        manager: entry.manager,
                        agent: entry.agent,
                    };
                    if set.insert(feature, grants).is_some() {
                        errors.push(FieldError::new(field, format!("duplicate feature '{}'", entry.feature)));
                    }
                }
                Some(_) => errors.push(FieldError::new(
                    field,
                    format!("feature '{}' is not available for {:?} accounts", entry.feature, class),
                )),
                None => errors.push(FieldError::new(field, format!("unknown feature '{}'", entry.feature))),
            }
        }

        if errors.is_empty() { Ok(Self(set)) } else { Err(errors) }
    }

    /// Permissions given to freshly created accounts: full access for admins and managers,
    /// read-only features for agents.
    pub fn default_for(class: TenantClass) -> Self {
        Self(
            class
                .catalog()
                .iter()
                .map(|&feature| {
                    (
                        feature,
                        Grants {
                            admin: true,
                            manager: true,
                            agent: feature.is_view(),
                        },
                    )
                })
                .collect(),
        )
    }

    pub fn grants(&self, feature: Feature) -> Option<Grants> {
        self.0.get(&feature).copied()
    }

    /// Serialize back to the stored array shape, in feature order.
    pub fn to_entries(&self) -> Vec<PermissionEntry> {
        self.0
            .iter()
            .map(|(feature, grants)| PermissionEntry {
                feature: feature.as_str().to_string(),
                admin: grants.admin,
                manager: grants.manager,
                agent: grants.agent,
            })
            .collect()
    }
}

/// Effective access decision for one feature.
pub fn is_allowed(role: Role, team_role: TeamRole, permissions: &PermissionSet, feature: Feature) -> bool {
    if role == Role::Admin {
        return true;
    }
    permissions.grants(feature).is_some_and(|grants| grants.allows(team_role))
}

/// Implemented by the markers in [`feature`].
pub trait FeatureMarker: Send + Sync + 'static {
    const FEATURE: Feature;
}

/// The caller's identity as currently stored, loaded fresh for each authorized request.
#[derive(Debug, Clone)]
pub struct AuthorizedUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub team_role: TeamRole,
    pub permissions: PermissionSet,
}

impl AuthorizedUser {
    pub fn is_platform_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Platform admins see every tenant's rows; everyone else sees their own.
    pub fn scope(&self) -> TenantScope {
        if self.is_platform_admin() {
            TenantScope::All
        } else {
            TenantScope::Owner(self.id)
        }
    }

    pub fn can(&self, feature: Feature) -> bool {
        is_allowed(self.role, self.team_role, &self.permissions, feature)
    }

    /// Resolve a bearer identity against the users table.
    #[instrument(skip(state, current), fields(user_id = %abbrev_uuid(&current.id)), err)]
    pub async fn load(state: &AppState, current: &CurrentUser) -> Result<Self> {
        let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
        let user = Users::new(&mut conn)
            .get_by_id(current.id)
            .await?
            .ok_or_else(|| Error::Unauthenticated {
                message: Some("Invalid or expired token".to_string()),
            })?;

        let class = TenantClass::for_role(user.role);
        Ok(Self {
            permissions: PermissionSet::from_stored(class, &user.permissions),
            id: user.id,
            email: user.email,
            role: user.role,
            team_role: user.team_role,
        })
    }
}

/// Extractor that authenticates the bearer token, reloads the user, and requires `F`.
///
/// Rejects with 401 when the token is missing/invalid or the user no longer exists, and 403 when
/// the user's current permissions do not grant the feature.
pub struct RequiresPermission<F: FeatureMarker> {
    pub user: AuthorizedUser,
    _feature: PhantomData<F>,
}

impl<F: FeatureMarker> FromRequestParts<AppState> for RequiresPermission<F> {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        let user = AuthorizedUser::load(state, &current).await?;

        if !user.can(F::FEATURE) {
            return Err(Error::InsufficientPermissions { feature: F::FEATURE });
        }

        Ok(Self {
            user,
            _feature: PhantomData,
        })
    }
}
