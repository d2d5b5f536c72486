//! OpenAPI documentation for the control API.
//!
//! Served as JSON at `/api-docs/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{api, auth, errors};

/// Registers the bearer scheme referenced by `security(("BearerAuth" = []))` on handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token from `POST /login` or `POST /signup`:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        api::handlers::auth::login,
        api::handlers::auth::signup,
        api::handlers::profile::get_profile,
        api::handlers::profile::update_profile,
        api::handlers::profile::change_password,
        api::handlers::plans::list_plans,
        api::handlers::plans::get_plan,
        api::handlers::plans::create_plan,
        api::handlers::plans::update_plan,
        api::handlers::plans::delete_plan,
        api::handlers::plans::toggle_plan,
        api::handlers::resellers::list_resellers,
        api::handlers::resellers::get_reseller,
        api::handlers::resellers::create_reseller,
        api::handlers::resellers::update_reseller,
        api::handlers::vendors::list_vendors,
        api::handlers::vendors::get_vendor,
        api::handlers::vendors::create_vendor,
        api::handlers::vendors::update_vendor,
        api::handlers::vendors::delete_vendor,
        api::handlers::vendors::list_mappings,
        api::handlers::vendors::replace_mappings,
        api::handlers::wallet::get_balance,
        api::handlers::wallet::list_transactions,
        api::handlers::wallet::create_transaction,
        api::handlers::wallet::list_user_transactions,
        api::handlers::users::list_users,
        api::handlers::users::get_user,
        api::handlers::users::update_permissions,
        api::handlers::users::permissions_catalog,
        api::handlers::rcs_bots::list_bots,
        api::handlers::rcs_bots::get_bot,
        api::handlers::rcs_bots::create_bot,
        api::handlers::rcs_bots::update_bot,
        api::handlers::rcs_bots::delete_bot,
        api::handlers::campaigns::list_campaigns,
        api::handlers::campaigns::get_campaign,
        api::handlers::campaigns::create_campaign,
        api::handlers::campaigns::update_campaign,
        api::handlers::campaigns::delete_campaign,
        api::handlers::templates::list_templates,
        api::handlers::templates::get_template,
        api::handlers::templates::create_template,
        api::handlers::templates::update_template,
        api::handlers::templates::delete_template,
        api::handlers::contacts::list_contacts,
        api::handlers::contacts::get_contact,
        api::handlers::contacts::create_contact,
        api::handlers::contacts::update_contact,
        api::handlers::contacts::delete_contact,
    ),
    components(
        schemas(
            errors::ErrorBody,
            errors::FieldError,
            auth::permissions::Feature,
            auth::permissions::PermissionEntry,
            auth::permissions::TenantClass,
            api::models::common::Channel,
            api::models::common::RecordStatus,
            api::models::common::MessageResponse,
            api::models::users::Role,
            api::models::users::TeamRole,
            api::models::users::UserResponse,
            api::models::users::ProfileResponse,
            api::models::plans::PlanResponse,
            api::models::resellers::ResellerResponse,
            api::models::vendors::VendorResponse,
            api::models::wallet::WalletTransactionResponse,
            api::models::rcs_bots::RcsBotResponse,
            api::models::campaigns::CampaignResponse,
            api::models::templates::TemplateResponse,
            api::models::contacts::ContactResponse,
        )
    ),
    tags(
        (name = "authentication", description = "Login and account registration"),
        (name = "profile", description = "The caller's own account"),
        (name = "plans", description = "Subscription plans. Reads are public, writes need a platform admin."),
        (name = "resellers", description = "Reseller accounts and their paired logins"),
        (name = "vendors", description = "Upstream delivery vendors and the users routed to them"),
        (name = "wallet", description = "Append-only credit ledger"),
        (name = "users", description = "User administration and permission catalogs"),
        (name = "rcs", description = "RCS bot configurations"),
        (name = "campaigns", description = "Messaging campaigns"),
        (name = "templates", description = "Message templates"),
        (name = "contacts", description = "Tenant address book"),
    ),
    info(
        title = "NotifyNow Control API",
        version = "1.0.0",
        description = "Multi-tenant messaging platform backend.

## Responses

Successful responses carry `\"success\": true` next to the payload. Failures return
`{\"success\": false, \"message\": \"...\"}`, plus an `errors` array of `{field, message}` when
validation fails.",
    ),
)]
pub struct ApiDoc;
