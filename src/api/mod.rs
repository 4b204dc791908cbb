use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::domain::Role;
use crate::services::{
    AccountService, AuthService, Clock, CredentialStore, LogNotifier, Notifier,
    SeaOrmAccountService, SeaOrmAuthService, SystemClock, TokenService,
};

mod admin;
pub mod auth;
mod error;
pub mod guard;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use guard::{CurrentClaims, CurrentRefresh, RoleGate};
pub use types::*;
pub use validation::ApiJson;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: Arc<TokenService>,

    pub auth: Arc<dyn AuthService>,

    pub accounts: Arc<dyn AccountService>,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub fn auth(&self) -> &dyn AuthService {
        self.auth.as_ref()
    }

    #[must_use]
    pub fn accounts(&self) -> &dyn AccountService {
        self.accounts.as_ref()
    }
}

/// Production wiring: wall clock and log-based token delivery.
pub async fn create_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_url,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    create_app_state_with(config, store, Arc::new(SystemClock), Arc::new(LogNotifier))
}

/// Build the state around an existing store with an injected clock and notifier.
pub fn create_app_state_with(
    config: Config,
    store: Store,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
) -> anyhow::Result<Arc<AppState>> {
    let credentials = CredentialStore::from_config(&config.security)?;
    let tokens = Arc::new(TokenService::new(&config.tokens, clock.clone()));

    let auth: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        credentials,
        tokens.clone(),
        clock.clone(),
        notifier,
        config.security.clone(),
    ));

    let accounts: Arc<dyn AccountService> =
        Arc::new(SeaOrmAccountService::new(store.clone(), clock));

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        tokens,
        auth,
        accounts,
        start_time: std::time::Instant::now(),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .merge(create_public_router())
        .merge(create_protected_router(state.clone()))
        .merge(create_refresh_router(state.clone()))
        .merge(create_admin_router(state.clone()))
        .with_state(state.clone());

    let cors_layer = if cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            user_id = tracing::field::Empty,
        )
    });

    Router::new()
        .route("/health", get(system::health))
        .route("/api/v1/", get(system::index))
        .with_state(state)
        .nest("/api/v1", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(trace_layer)
}

fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(system::index))
        .route("/info", get(system::info))
        .route("/ping", get(system::ping))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/verify-email", post(auth::verify_email))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/change-password", post(auth::change_password))
        .route(
            "/auth/resend-verification",
            post(auth::resend_verification),
        )
        .route_layer(middleware::from_fn_with_state(state, guard::require_auth))
}

fn create_refresh_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/refresh", post(auth::refresh))
        .route_layer(middleware::from_fn_with_state(state, guard::require_refresh))
}

/// Admin routes: role gate first, then a verified account.
fn create_admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let staff = Router::new()
        .route("/admin/users/{id}", get(admin::get_user))
        .route("/admin/users/{id}/status", patch(admin::set_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_verified,
        ))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new(state.clone(), Role::STAFF),
            guard::require_role,
        ));

    let super_admin = Router::new()
        .route("/admin/users/{id}/role", patch(admin::set_role))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_verified,
        ))
        .route_layer(middleware::from_fn_with_state(
            RoleGate::new(state, &[Role::SuperAdmin]),
            guard::require_role,
        ));

    staff.merge(super_admin)
}
