// libs/organization-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::models::{
    CreateOrganizationRequest, OrganizationError, OrganizationSearchQuery, OrganizationView,
    UpdateOrganizationRequest,
};
use crate::services::{OrganizationAnalyticsService, OrganizationService};

impl From<OrganizationError> for AppError {
    fn from(e: OrganizationError) -> Self {
        match e {
            OrganizationError::NotFound => AppError::NotFound(e.to_string()),
            OrganizationError::AlreadyExists => AppError::BadRequest(e.to_string()),
            OrganizationError::NotOwner => AppError::Forbidden(e.to_string()),
            OrganizationError::ValidationError(msg) => AppError::ValidationError(msg),
            OrganizationError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}

#[axum::debug_handler]
pub async fn create_organization(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<CreateOrganizationRequest>, AppError>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    user.require_role(Role::Organization)?;

    let service = OrganizationService::new(state.store.clone());
    let organization = service.create_organization(&user.id, request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "data": OrganizationView::from(organization)
    }))))
}

#[axum::debug_handler]
pub async fn list_organizations(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<OrganizationSearchQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    let service = OrganizationService::new(state.store.clone());
    let organizations: Vec<OrganizationView> = service.list_organizations(query).await?
        .into_iter()
        .map(OrganizationView::from)
        .collect();

    Ok(Json(json!({
        "success": true,
        "count": organizations.len(),
        "data": organizations
    })))
}

#[axum::debug_handler]
pub async fn get_organization(
    State(state): State<AppState>,
    WithRejection(Path(organization_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    let service = OrganizationService::new(state.store.clone());
    let organization = service.get_organization(&organization_id.to_string()).await?;

    Ok(Json(json!({
        "success": true,
        "data": OrganizationView::from(organization)
    })))
}

#[axum::debug_handler]
pub async fn get_my_organization(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Organization)?;

    let service = OrganizationService::new(state.store.clone());
    let organization = service.get_organization_for_owner(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": OrganizationView::from(organization)
    })))
}

#[axum::debug_handler]
pub async fn update_my_organization(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateOrganizationRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Organization)?;

    let service = OrganizationService::new(state.store.clone());
    let current = service.get_organization_for_owner(&user.id).await?;
    let organization = service
        .update_organization(&current.id.to_string(), &user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Organization updated successfully",
        "data": OrganizationView::from(organization)
    })))
}

#[axum::debug_handler]
pub async fn update_organization(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Path(organization_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateOrganizationRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Organization)?;

    let service = OrganizationService::new(state.store.clone());
    let organization = service
        .update_organization(&organization_id.to_string(), &user.id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Organization updated successfully",
        "data": OrganizationView::from(organization)
    })))
}

#[axum::debug_handler]
pub async fn get_my_analytics(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Organization)?;

    let service = OrganizationAnalyticsService::new(state.store.clone());
    let analytics = service.get_analytics(&user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": analytics
    })))
}
