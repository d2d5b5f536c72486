//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection` (a pooled connection or an open transaction) and
//! exposes strongly-typed operations returning the models in [`crate::db::models`]. Most implement
//! the [`Repository`] trait; [`Wallet`] is an append-only ledger and has its own surface.
//!
//! Tenant-owned repositories ([`Campaigns`], [`Templates`], [`Contacts`], [`RcsBots`]) are built
//! with `scoped(conn, scope)`. Every query they run is restricted to the scope's owner, so a row
//! belonging to another tenant behaves exactly like a missing one.
//!
//! ```ignore
//! use notifyctl::db::handlers::{Campaigns, Repository};
//!
//! let mut conn = pool.acquire().await?;
//! let campaign = Campaigns::scoped(&mut conn, user.scope()).get_by_id(id).await?;
//! ```

pub mod campaigns;
pub mod contacts;
pub mod plans;
pub mod rcs_bots;
pub mod repository;
pub mod resellers;
pub mod templates;
pub mod users;
pub mod vendors;
pub mod wallet;

pub use campaigns::Campaigns;
pub use contacts::Contacts;
pub use plans::Plans;
pub use rcs_bots::RcsBots;
pub use repository::Repository;
pub use resellers::Resellers;
pub use templates::Templates;
pub use users::Users;
pub use vendors::Vendors;
pub use wallet::Wallet;
