// libs/appointment-cell/src/router.rs
use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: AppState) -> Router {
    // Every appointment operation needs an authenticated principal
    Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/my", get(handlers::get_my_appointments))
        .route("/organization", get(handlers::get_organization_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/queue", get(handlers::get_queue_status))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))
        .route("/{appointment_id}/cancel", patch(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}
