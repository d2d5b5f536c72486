//! # notifyctl: NotifyNow control API
//!
//! `notifyctl` is the backend for a multi-tenant messaging platform. Platform administrators
//! manage subscription plans, resellers and upstream messaging vendors; tenants manage RCS bot
//! configurations, campaigns, templates and contacts; every account carries a prepaid credit
//! wallet backed by an append-only ledger.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum) and all state lives in PostgreSQL.
//! A request flows through three stages:
//!
//! 1. **Authentication** ([`auth`]): the bearer token is decoded into a
//!    [`CurrentUser`](api::models::users::CurrentUser). Handlers that need authorization take a
//!    [`RequiresPermission`](auth::permissions::RequiresPermission) extractor, which reloads the
//!    user's role, team role and per-feature grants from the database so revocations apply on the
//!    next request.
//! 2. **Handlers** ([`api::handlers`]) validate input, pick a tenant scope and call a repository.
//! 3. **Repositories** ([`db::handlers`]) own the SQL. Tenant-owned tables are always filtered by
//!    the owning user unless the caller is a platform admin.
//!
//! Responses use a flat envelope: `{ "success": true, ...payload }` or
//! `{ "success": false, "message": "...", "errors": [...] }`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use notifyctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = notifyctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     notifyctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! }
//! ```
//!
//! Migrations are embedded and applied on startup; see [`migrator`].
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use crate::{
    api::models::users::{Role, TeamRole},
    auth::{
        password::{self, Argon2Params},
        permissions::{PermissionSet, TenantClass},
    },
    config::CorsOrigin,
    db::{
        handlers::{Repository, Users},
        models::users::UserCreateDBRequest,
    },
    openapi::ApiDoc,
};
use axum::{
    Json, Router,
    http::{self, HeaderValue},
    routing::{get, patch, post, put},
};
use bon::Builder;
pub use config::Config;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::UserId;

/// Shared state handed to every handler.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the notifyctl database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial platform admin if no account uses `email` yet.
///
/// Idempotent: an existing account keeps its data and only has its password replaced when one is
/// supplied. Without a password the admin cannot log in until one is set.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(
    email: &str,
    password: Option<&str>,
    argon2: Argon2Params,
    db: &PgPool,
) -> anyhow::Result<UserId> {
    let password_hash = match password {
        Some(pwd) => Some(password::hash_password_blocking(pwd.to_string(), argon2).await?),
        None => None,
    };

    let mut tx = db.begin().await?;
    let mut users = Users::new(&mut tx);

    if let Some(existing) = users.get_user_by_email(email).await? {
        if let Some(hash) = password_hash {
            users.set_password_hash(existing.id, &hash).await?;
        }
        tx.commit().await?;
        return Ok(existing.id);
    }

    let created = users
        .create(&UserCreateDBRequest {
            name: "Platform Admin".to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::Admin,
            team_role: TeamRole::Admin,
            permissions: PermissionSet::default_for(TenantClass::for_role(Role::Admin)).to_entries(),
            plan_id: None,
            company: None,
            contact_phone: None,
            channels_enabled: Vec::new(),
        })
        .await?;

    tx.commit().await?;
    info!(user_id = %types::abbrev_uuid(&created.id), "Created initial admin user");
    Ok(created.id)
}

async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let settings = &config.database.pool;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .idle_timeout(settings.idle_timeout)
        .connect(&config.database.url)
        .await?;
    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.auth.security.cors;
    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let origins = cors_config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin {
                CorsOrigin::Wildcard => None,
                // Url::as_str keeps a trailing slash that browsers never send in Origin
                CorsOrigin::Url(url) => Some(url.as_str().trim_end_matches('/').parse::<HeaderValue>()),
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(cors_config.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: every resource route plus health, docs, CORS and tracing.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    use api::handlers::{auth, campaigns, contacts, plans, profile, rcs_bots, resellers, templates, users, vendors, wallet};

    let api_routes = Router::new()
        // Authentication and the caller's own profile
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup))
        .route("/profile", get(profile::get_profile).put(profile::update_profile))
        .route("/profile/change-password", put(profile::change_password))
        // Plans (reads are public)
        .route("/plans", get(plans::list_plans).post(plans::create_plan))
        .route(
            "/plans/{id}",
            get(plans::get_plan).put(plans::update_plan).delete(plans::delete_plan),
        )
        .route("/plans/{id}/toggle", patch(plans::toggle_plan))
        // Resellers
        .route("/resellers", get(resellers::list_resellers).post(resellers::create_reseller))
        .route("/resellers/{id}", get(resellers::get_reseller).put(resellers::update_reseller))
        // Vendors and user routing
        .route("/vendors", get(vendors::list_vendors).post(vendors::create_vendor))
        .route("/vendors/mappings", get(vendors::list_mappings).post(vendors::replace_mappings))
        .route(
            "/vendors/{id}",
            get(vendors::get_vendor).put(vendors::update_vendor).delete(vendors::delete_vendor),
        )
        // RCS bots
        .route("/rcs/bots", get(rcs_bots::list_bots).post(rcs_bots::create_bot))
        .route(
            "/rcs/bots/{id}",
            get(rcs_bots::get_bot).put(rcs_bots::update_bot).delete(rcs_bots::delete_bot),
        )
        // Wallet
        .route("/wallet/balance", get(wallet::get_balance))
        .route(
            "/wallet/transactions",
            get(wallet::list_transactions).post(wallet::create_transaction),
        )
        // User administration
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/{id}/permissions", put(users::update_permissions))
        .route("/users/{id}/wallet/transactions", get(wallet::list_user_transactions))
        .route("/permissions/catalog", get(users::permissions_catalog))
        // Messaging resources
        .route("/campaigns", get(campaigns::list_campaigns).post(campaigns::create_campaign))
        .route(
            "/campaigns/{id}",
            get(campaigns::get_campaign)
                .put(campaigns::update_campaign)
                .delete(campaigns::delete_campaign),
        )
        .route("/templates", get(templates::list_templates).post(templates::create_template))
        .route(
            "/templates/{id}",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/contacts", get(contacts::list_contacts).post(contacts::create_contact))
        .route(
            "/contacts/{id}",
            get(contacts::get_contact)
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(api_routes)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let router = router.layer(create_cors_layer(&state.config)?).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Connect to the configured database and build the application
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::new_with_pool(config, None).await
    }

    /// Build the application on an existing pool, or connect when `pool` is `None`.
    ///
    /// Runs migrations and ensures the initial admin account exists.
    pub async fn new_with_pool(config: Config, pool: Option<PgPool>) -> anyhow::Result<Self> {
        debug!("Starting notifyctl with configuration: {:#?}", config);

        let pool = match pool {
            Some(pool) => pool,
            None => setup_database(&config).await?,
        };
        migrator().run(&pool).await?;

        create_initial_admin_user(
            &config.admin_email,
            config.admin_password.as_deref(),
            config.auth.password.argon2_params(),
            &pool,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("notifyctl listening on http://{}", bind_addr);

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
