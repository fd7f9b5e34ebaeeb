use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::database::Repository;
use crate::handlers;
use crate::middleware::{access_denied_middleware, session_middleware};
use crate::services::Mailer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>, mailer: Arc<dyn Mailer>) -> Self {
        Self { repo, mailer }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(page_routes())
        .merge(admin_routes())
        .merge(organization_routes())
        .route("/crypto_login", get(handlers::crypto_login))
        .fallback(handlers::handler_404)
        // Global middleware
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(middleware::from_fn(access_denied_middleware))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::homepage))
        .route("/glossary", get(handlers::glossary))
        .route("/content/:page", get(handlers::content_page))
        .route("/subscribe", get(handlers::subscribe_get).post(handlers::subscribe_post))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/org_management",
            get(handlers::org_management).post(handlers::org_management_submit),
        )
        .route(
            "/org_management/:org_id",
            get(handlers::org_management_focus).post(handlers::org_management_focus_submit),
        )
        .route(
            "/org_invite_action/:invite_id",
            get(handlers::org_invite_action).post(handlers::org_invite_action_submit),
        )
        .route("/delete_admin/:org_id/:user_id", post(handlers::delete_admin))
        .route("/delete_invite/:org_id/:invite_id", post(handlers::delete_invite))
}

fn organization_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organization_form/:org_id",
            get(handlers::organization_form).post(handlers::organization_form_submit),
        )
        .route("/delete_organization/:org_id", post(handlers::delete_organization))
}

fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = config::config()
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::new()
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    }
}
