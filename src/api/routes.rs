//! Router assembly and shared application state

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;

use crate::api::auth;
use crate::api::handlers::{admin, front, health, webhook};
use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::services::ServiceFactory;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub db: DatabaseService,
    pub services: ServiceFactory,
    pub settings: Settings,
}

/// Build the full application router.
///
/// The public surface sits behind the bearer-or-origin guard, the admin
/// surface behind the bearer-only guard. `/health/` stays open for
/// probes.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/register/", post(front::register))
        .route("/create_request/", post(front::create_request))
        .route("/requests_history/", post(front::requests_history))
        .route("/master/active/", post(front::master_active))
        .route("/assign/", post(front::assign))
        .route("/close/", post(front::close))
        .route("/profile/", post(front::profile))
        .route("/types/", post(front::types))
        .route("/amocrm/webhook/", post(webhook::amocrm_webhook))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_caller,
        ));

    let admin_routes = Router::new()
        .route("/admin/delete_user/", post(admin::delete_user))
        .route("/admin/import_balances/", post(admin::import_balances))
        .route("/admin/repair_referrers/", post(admin::repair_referrers))
        .route("/admin/set_ratings/", post(admin::set_ratings))
        .route("/admin/set_default_outcome/", post(admin::set_default_outcome))
        .route("/admin/record_deposit/", post(admin::record_deposit))
        .route("/admin/import_leads/", post(admin::import_leads))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .merge(public)
        .merge(admin_routes)
        .route("/health/", get(health::health))
        .with_state(state)
}
