// libs/organization-cell/src/router.rs
use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn organization_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::list_organizations).post(handlers::create_organization))
        .route("/me", get(handlers::get_my_organization).put(handlers::update_my_organization))
        .route("/me/analytics", get(handlers::get_my_analytics))
        .route("/{organization_id}", get(handlers::get_organization).put(handlers::update_organization))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
