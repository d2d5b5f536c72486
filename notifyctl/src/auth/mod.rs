//! Authentication and authorization.
//!
//! - [`session`]: HS256 session tokens issued at login/signup
//! - [`current_user`]: the `Authorization: Bearer <token>` extractor for [`CurrentUser`]
//! - [`password`]: Argon2id hashing and verification
//! - [`permissions`]: the feature catalog, permission evaluation and the
//!   [`permissions::RequiresPermission`] extractor applied to every gated route
//!
//! [`CurrentUser`]: crate::api::models::users::CurrentUser

pub mod current_user;
pub mod password;
pub mod permissions;
pub mod session;
