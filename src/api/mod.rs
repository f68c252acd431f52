use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{MethodRouter, delete, get, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Store;
use crate::domain::Policy;
use crate::services::{
    AssetService, AuthService, DueSummaryService, FileStorage, MaintenanceService, ReportService,
    UserAdminService,
};
use crate::state::SharedState;

mod admin_users;
mod assets;
pub mod auth;
mod error;
mod files;
mod maintenance;
mod observability;
mod reports;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.shared.store
    }

    #[must_use]
    pub fn storage(&self) -> &FileStorage {
        &self.shared.storage
    }

    #[must_use]
    pub fn due_summary(&self) -> &DueSummaryService {
        &self.shared.due_summary
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn asset_service(&self) -> &Arc<dyn AssetService> {
        &self.shared.asset_service
    }

    #[must_use]
    pub fn maintenance_service(&self) -> &Arc<dyn MaintenanceService> {
        &self.shared.maintenance_service
    }

    #[must_use]
    pub fn user_admin_service(&self) -> &Arc<dyn UserAdminService> {
        &self.shared.user_admin_service
    }

    #[must_use]
    pub fn report_service(&self) -> &Arc<dyn ReportService> {
        &self.shared.report_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, max_upload_bytes) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.storage.max_upload_bytes,
        )
    };

    let public_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/qr/asset/{asset_id}", get(files::get_qr_by_asset))
        .route("/qr/{filename}", get(files::get_qr));

    let api_router = Router::new()
        .merge(create_protected_router(&state))
        .merge(public_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state.clone());

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/", get(system::banner))
        .route("/health", get(system::health))
        .with_state(state)
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

/// Attaches `policy` to one method route.
fn guarded(
    route: MethodRouter<Arc<AppState>>,
    state: &Arc<AppState>,
    policy: Policy,
) -> MethodRouter<Arc<AppState>> {
    route.route_layer(middleware::from_fn_with_state(
        auth::PolicyGuard {
            state: state.clone(),
            policy,
        },
        auth::enforce_policy,
    ))
}

fn create_protected_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let any = |route| guarded(route, state, Policy::ANY);
    let admin = |route| guarded(route, state, Policy::ADMIN);
    let staff = |route| guarded(route, state, Policy::ADMIN_OR_MANAGER);

    Router::new()
        .route("/auth/me", any(get(auth::get_current_user)))
        .route("/auth/change-password", any(post(auth::change_password)))
        .route(
            "/assets",
            any(get(assets::list_assets)).merge(staff(post(assets::create_asset))),
        )
        .route("/assets/due", any(get(assets::list_due_assets)))
        .route(
            "/assets/dashboard-summary",
            any(get(assets::dashboard_summary)),
        )
        .route(
            "/assets/{asset_id}",
            any(get(assets::get_asset))
                .merge(staff(put(assets::update_asset)))
                .merge(admin(delete(assets::delete_asset))),
        )
        .route("/assets/{asset_id}/qr", any(get(assets::get_asset_qr)))
        .route(
            "/assets/{asset_id}/latest-log",
            any(get(assets::get_latest_log)),
        )
        .route(
            "/assets/{asset_id}/maintenance",
            any(get(maintenance::list_logs)).merge(guarded(
                post(maintenance::create_log),
                state,
                Policy::LOG_ON_ASSET,
            )),
        )
        .route("/maintenance/due", any(get(maintenance::list_due_logs)))
        .route(
            "/maintenance/{log_id}",
            guarded(put(maintenance::update_log), state, Policy::EDIT_OWN_LOG)
                .merge(admin(delete(maintenance::delete_log))),
        )
        .route("/upload", any(post(files::upload_file)))
        .route("/uploads/{filename}", any(get(files::get_upload)))
        .route("/reports/monthly-cost", any(get(reports::monthly_cost)))
        .route(
            "/reports/warranty-expiring",
            any(get(reports::warranty_expiring)),
        )
        .route("/reports/assets/export", any(get(reports::export_assets)))
        .route("/reports/logs/export", any(get(reports::export_logs)))
        .route(
            "/admin/users",
            admin(get(admin_users::list_users)).merge(admin(post(admin_users::create_user))),
        )
        .route(
            "/admin/users/bulk",
            admin(post(admin_users::bulk_create_users)),
        )
        .route(
            "/admin/users/suggest-username",
            admin(get(admin_users::suggest_username)),
        )
        .route(
            "/admin/users/{user_id}/role",
            admin(put(admin_users::update_role)),
        )
        .route(
            "/admin/users/{user_id}/status",
            admin(put(admin_users::update_status)),
        )
        .route(
            "/admin/users/{user_id}/reset-password",
            admin(post(admin_users::reset_password)),
        )
        .route(
            "/system/tasks/due-summary",
            staff(post(system::trigger_due_summary)),
        )
        .route("/audit", admin(get(system::list_audit)))
        .route("/metrics", admin(get(observability::get_metrics)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
}
