#![forbid(unsafe_code)]
//! HTTP surface of valeapp: JSON endpoints for employees and admins over a
//! shared voucher lifecycle.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use valeapp_auth::{AuthConfig, Authenticator};
use valeapp_geo::GeoLookup;
use valeapp_lifecycle::VoucherLifecycle;
use valeapp_store::VoucherStore;

mod config;
mod http;

pub use config::{ServerConfig, DEFAULT_BIND, DEFAULT_MAX_UPLOAD_BYTES};

pub const CRATE_NAME: &str = "valeapp-server";

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<VoucherLifecycle>,
    pub auth: Arc<Authenticator>,
    pub config: Arc<ServerConfig>,
    request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn VoucherStore>,
        geo: Arc<dyn GeoLookup>,
        auth: AuthConfig,
        config: ServerConfig,
    ) -> Self {
        let auth = Authenticator::new(Arc::clone(&store), auth);
        let lifecycle = VoucherLifecycle::new(store, geo, *auth.hasher());
        Self {
            lifecycle: Arc::new(lifecycle),
            auth: Arc::new(auth),
            config: Arc::new(config),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }

    pub(crate) fn next_request_id(&self) -> String {
        let id = self.request_id_seed.fetch_add(1, Ordering::Relaxed);
        format!("req-{id:016x}")
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/healthz", get(http::system::healthz_handler))
        .route("/readyz", get(http::system::readyz_handler))
        .route("/v1/openapi.json", get(http::system::openapi_handler))
        .route(
            "/v1/justification-kinds",
            get(http::system::justification_kinds_handler),
        )
        .route(
            "/v1/auth/admin/login",
            post(http::auth::admin_login_handler),
        )
        .route(
            "/v1/auth/employee/login",
            post(http::auth::employee_login_handler),
        )
        .route(
            "/v1/auth/employee/password",
            post(http::auth::password_setup_handler),
        )
        .route("/v1/auth/logout", post(http::auth::logout_handler))
        .route("/v1/auth/session", get(http::auth::session_handler))
        .route("/v1/vouchers", get(http::vouchers::list_vouchers_handler))
        .route(
            "/v1/vouchers/:key/justify",
            post(http::vouchers::justify_handler),
        )
        .route("/v1/admin/stats", get(http::admin::stats_handler))
        .route(
            "/v1/admin/vouchers/import",
            post(http::admin::import_handler),
        )
        .route("/v1/admin/cleanup", post(http::admin::cleanup_handler))
        .route(
            "/v1/admin/export/:dataset",
            get(http::admin::export_handler),
        )
        .route(
            "/v1/admin/employees",
            get(http::admin::list_employees_handler).post(http::admin::create_employee_handler),
        )
        .route(
            "/v1/admin/admins",
            get(http::admin::list_admins_handler).post(http::admin::create_admin_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            http::request_tracing::trace_request,
        ))
        .with_state(state)
}
