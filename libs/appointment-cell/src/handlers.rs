// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::AppState;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;

use crate::models::{
    AppointmentError, AppointmentListQuery, AppointmentStatus, BookAppointmentRequest,
    UpdateStatusRequest,
};
use crate::services::{AppointmentBookingService, AppointmentLifecycleService};

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        match e {
            AppointmentError::NotFound | AppointmentError::OrganizationNotFound => {
                AppError::NotFound(e.to_string())
            }
            AppointmentError::Unauthorized => AppError::Forbidden(e.to_string()),
            AppointmentError::MissingFields
            | AppointmentError::InvalidTime(_)
            | AppointmentError::InvalidDate(_)
            | AppointmentError::MissingStatus
            | AppointmentError::InvalidStatus(_) => AppError::ValidationError(e.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            _ => AppError::BadRequest(e.to_string()),
        }
    }
}

// ==============================================================================
// QUERY PARSING
// ==============================================================================

fn parse_status_filter(status: Option<&str>) -> Result<Option<AppointmentStatus>, AppointmentError> {
    status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<AppointmentStatus>)
        .transpose()
}

fn parse_date_filter(date: Option<&str>) -> Result<Option<NaiveDate>, AppointmentError> {
    date.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| AppointmentError::InvalidDate(d.to_string()))
        })
        .transpose()
}

// ==============================================================================
// HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Json(request), _): WithRejection<Json<BookAppointmentRequest>, AppError>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    user.require_role(Role::User)?;

    let service = AppointmentBookingService::new(state.store.clone());
    let appointment = service.book_appointment(&user.id, request).await?;

    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "message": "Appointment booked successfully",
        "data": appointment
    }))))
}

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Query(query), _): WithRejection<Query<AppointmentListQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::User)?;
    let status = parse_status_filter(query.status.as_deref())?;

    let service = AppointmentBookingService::new(state.store.clone());
    let appointments = service.list_user_appointments(&user.id, status).await?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "data": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_organization_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Query(query), _): WithRejection<Query<AppointmentListQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Organization)?;
    let status = parse_status_filter(query.status.as_deref())?;
    let date = parse_date_filter(query.date.as_deref())?;

    let service = AppointmentBookingService::new(state.store.clone());
    let appointments = service.list_organization_appointments(&user.id, status, date).await?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "data": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    let appointment = service
        .get_appointment_for(&appointment_id.to_string(), &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": appointment
    })))
}

#[axum::debug_handler]
pub async fn get_queue_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(state.store.clone());
    let queue = service
        .get_queue_status(&appointment_id.to_string(), &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": queue
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateStatusRequest>, AppError>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::Organization)?;

    let service = AppointmentLifecycleService::new(
        state.store.clone(),
        state.config.strict_status_transitions,
    );
    let appointment = service
        .update_status(&appointment_id.to_string(), request.status.as_deref(), &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment status updated",
        "data": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    WithRejection(Path(appointment_id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<Json<Value>, AppError> {
    user.require_role(Role::User)?;

    let service = AppointmentLifecycleService::new(
        state.store.clone(),
        state.config.strict_status_transitions,
    );
    let appointment = service
        .cancel_appointment(&appointment_id.to_string(), &user.id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment cancelled successfully",
        "data": appointment
    })))
}
