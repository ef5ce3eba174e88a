// libs/appointment-cell/src/services/lifecycle.rs
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use organization_cell::services::OrganizationService;
use shared_database::{format_timestamp, DynDocumentStore};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, APPOINTMENTS};
use crate::services::queue::QueuePolicy;
use crate::services::{load_appointment, parse_appointment};

/// Status changes by the organization and cancellation by the booking user.
pub struct AppointmentLifecycleService {
    store: DynDocumentStore,
    policy: QueuePolicy,
    organizations: OrganizationService,
    strict_transitions: bool,
}

impl AppointmentLifecycleService {
    pub fn new(store: DynDocumentStore, strict_transitions: bool) -> Self {
        Self {
            policy: QueuePolicy::new(store.clone()),
            organizations: OrganizationService::new(store.clone()),
            store,
            strict_transitions,
        }
    }

    pub async fn update_status(
        &self,
        appointment_id: &str,
        new_status: Option<&str>,
        user_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        let new_status = new_status
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(AppointmentError::MissingStatus)?
            .parse::<AppointmentStatus>()?;

        debug!("Updating appointment {} to {}", appointment_id, new_status);

        let appointment = load_appointment(&self.store, appointment_id).await?;
        let organization = self.organizations
            .get_organization(&appointment.organization_id.to_string())
            .await?;
        if organization.user_id != user_id {
            return Err(AppointmentError::Unauthorized);
        }

        self.validate_status_transition(appointment.status, new_status)?;

        let updated = self.persist_status(&appointment, new_status).await?;
        info!("Appointment {} moved from {} to {}", updated.id, appointment.status, new_status);

        if new_status.leaves_queue() {
            self.policy
                .renumber_queue(&updated.organization_id.to_string(), updated.appointment_date)
                .await;
        }

        Ok(updated)
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: &str,
        user_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment {} for user {}", appointment_id, user_id);

        let appointment = load_appointment(&self.store, appointment_id).await?;
        if appointment.user_id != user_id {
            return Err(AppointmentError::Unauthorized);
        }

        match appointment.status {
            AppointmentStatus::Completed => return Err(AppointmentError::CannotCancelCompleted),
            AppointmentStatus::Cancelled => return Err(AppointmentError::AlreadyCancelled),
            AppointmentStatus::Pending | AppointmentStatus::InProgress => {}
        }

        let cancelled = self.persist_status(&appointment, AppointmentStatus::Cancelled).await?;
        info!("Appointment {} cancelled by user {}", cancelled.id, user_id);

        self.policy
            .renumber_queue(&cancelled.organization_id.to_string(), cancelled.appointment_date)
            .await;

        Ok(cancelled)
    }

    /// With strict transitions off, any known status may follow any other.
    pub fn validate_status_transition(
        &self,
        current: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if self.strict_transitions && !current.can_transition_to(next) {
            return Err(AppointmentError::InvalidStatusTransition { from: current, to: next });
        }
        Ok(())
    }

    async fn persist_status(
        &self,
        appointment: &Appointment,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let patch = json!({
            "status": status,
            "updated_at": format_timestamp(Utc::now()),
        });

        let updated = self.store
            .update_by_id(APPOINTMENTS, &appointment.id.to_string(), patch)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .ok_or(AppointmentError::NotFound)?;

        parse_appointment(updated)
    }
}
