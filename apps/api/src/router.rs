use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use organization_cell::router::organization_routes;
use shared_database::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Queue booking API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/organizations", organization_routes(state))
}
