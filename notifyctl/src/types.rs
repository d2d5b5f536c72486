//! Common type definitions shared across the API and database layers.
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`], [`PlanId`], [`ResellerId`], [`VendorId`]
//! - [`CampaignId`], [`TemplateId`], [`ContactId`], [`RcsBotId`], [`WalletTransactionId`]
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging

use uuid::Uuid;

pub type UserId = Uuid;
pub type PlanId = Uuid;
pub type ResellerId = Uuid;
pub type VendorId = Uuid;
pub type CampaignId = Uuid;
pub type TemplateId = Uuid;
pub type ContactId = Uuid;
pub type RcsBotId = Uuid;
pub type WalletTransactionId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Tenant scope applied to tenant-owned tables (campaigns, templates, contacts, bots).
///
/// `All` is used for platform admins, who can see every tenant's rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    All,
    Owner(UserId),
}

impl TenantScope {
    /// The owner id to bind into `($n::uuid IS NULL OR user_id = $n)` filters.
    pub fn owner(&self) -> Option<UserId> {
        match self {
            TenantScope::All => None,
            TenantScope::Owner(id) => Some(*id),
        }
    }
}
