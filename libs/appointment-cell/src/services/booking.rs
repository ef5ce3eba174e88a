// libs/appointment-cell/src/services/booking.rs
use std::collections::HashMap;

use chrono::{Local, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use organization_cell::models::{parse_clock_time, Organization, OrganizationSummary, UserSummary};
use organization_cell::services::OrganizationService;
use shared_database::{DynDocumentStore, StoreQuery};

use crate::models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentStatus, BookAppointmentRequest,
    QueueStatus, APPOINTMENTS,
};
use crate::services::queue::{compute_estimated_wait, is_within_working_hours, QueuePolicy};
use crate::services::{load_appointment, parse_appointment, to_document};

pub struct AppointmentBookingService {
    store: DynDocumentStore,
    policy: QueuePolicy,
    organizations: OrganizationService,
}

impl AppointmentBookingService {
    pub fn new(store: DynDocumentStore) -> Self {
        Self {
            policy: QueuePolicy::new(store.clone()),
            organizations: OrganizationService::new(store.clone()),
            store,
        }
    }

    // ==============================================================================
    // BOOKING
    // ==============================================================================

    pub async fn book_appointment(
        &self,
        user_id: &str,
        request: BookAppointmentRequest,
    ) -> Result<AppointmentDetails, AppointmentError> {
        self.book_appointment_on(user_id, request, Local::now().date_naive()).await
    }

    /// Validates in a fixed order and stops at the first failure.
    pub async fn book_appointment_on(
        &self,
        user_id: &str,
        request: BookAppointmentRequest,
        today: NaiveDate,
    ) -> Result<AppointmentDetails, AppointmentError> {
        debug!("Booking appointment for user {}", user_id);

        let (Some(organization_id), Some(expert_name), Some(service_name), Some(date), Some(time)) = (
            required(&request.organization_id),
            required(&request.expert_name),
            required(&request.service_name),
            required(&request.appointment_date),
            required(&request.appointment_time),
        ) else {
            return Err(AppointmentError::MissingFields);
        };

        if parse_clock_time(time).is_none() {
            return Err(AppointmentError::InvalidTime(time.to_string()));
        }
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| AppointmentError::InvalidDate(date.to_string()))?;

        let organization_id = Uuid::parse_str(organization_id)
            .map_err(|_| AppointmentError::OrganizationNotFound)?;
        let organization = self.organizations
            .get_organization(&organization_id.to_string())
            .await?;

        if date < today {
            return Err(AppointmentError::PastDate);
        }

        if !is_within_working_hours(&organization.working_hours, date, time) {
            return Err(AppointmentError::OutsideWorkingHours);
        }

        let expert = organization.find_expert(expert_name).ok_or(AppointmentError::ExpertNotFound)?;
        if !expert.available {
            return Err(AppointmentError::ExpertUnavailable);
        }

        let org_key = organization.id.to_string();
        if !self.policy.is_slot_available(&org_key, date, time, expert_name).await {
            return Err(AppointmentError::SlotTaken);
        }

        let queue_position = self.policy.compute_queue_position(&org_key, date).await;
        let estimated_wait_time = compute_estimated_wait(queue_position, organization.appointment_duration);

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            organization_id: organization.id,
            expert_name: expert_name.to_string(),
            service_name: service_name.to_string(),
            appointment_date: date,
            appointment_time: time.to_string(),
            status: AppointmentStatus::Pending,
            queue_position,
            estimated_wait_time,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            created_at: now,
            updated_at: now,
        };

        let created = self.store
            .insert(APPOINTMENTS, to_document(&appointment))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;
        let appointment = parse_appointment(created)?;

        info!(
            "Appointment {} booked with {} at {} {} (position {})",
            appointment.id, appointment.expert_name, appointment.appointment_date,
            appointment.appointment_time, appointment.queue_position
        );

        Ok(AppointmentDetails {
            user: Some(self.organizations.get_user_summary(user_id).await),
            organization: Some(organization.summary()),
            appointment,
        })
    }

    // ==============================================================================
    // RETRIEVAL
    // ==============================================================================

    pub async fn get_appointment(&self, appointment_id: &str) -> Result<Appointment, AppointmentError> {
        load_appointment(&self.store, appointment_id).await
    }

    /// Visible to the booking user and to the owner of the organization.
    pub async fn get_appointment_for(
        &self,
        appointment_id: &str,
        user_id: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_appointment(appointment_id).await?;
        if appointment.user_id == user_id {
            return Ok(appointment);
        }

        match self.organizations.get_organization(&appointment.organization_id.to_string()).await {
            Ok(organization) if organization.user_id == user_id => Ok(appointment),
            Ok(_) => Err(AppointmentError::Unauthorized),
            Err(e) => {
                debug!("Organization of appointment {} unavailable: {}", appointment.id, e);
                Err(AppointmentError::Unauthorized)
            }
        }
    }

    /// Most recent first.
    pub async fn list_user_appointments(
        &self,
        user_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        debug!("Listing appointments for user {}", user_id);

        let mut query = StoreQuery::new().eq("user_id", user_id);
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }
        query = query.sort_desc("appointment_date").sort_desc("appointment_time");

        let appointments = self.fetch(&query).await?;

        let mut organizations: HashMap<Uuid, Option<OrganizationSummary>> = HashMap::new();
        let mut details = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            if !organizations.contains_key(&appointment.organization_id) {
                let summary = self.organization_summary(appointment.organization_id).await;
                organizations.insert(appointment.organization_id, summary);
            }
            details.push(AppointmentDetails {
                organization: organizations.get(&appointment.organization_id).cloned().flatten(),
                user: None,
                appointment,
            });
        }

        Ok(details)
    }

    /// Queue order for the organization owned by `owner_id`.
    pub async fn list_organization_appointments(
        &self,
        owner_id: &str,
        status: Option<AppointmentStatus>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AppointmentDetails>, AppointmentError> {
        let organization = self.organizations
            .find_by_owner(owner_id)
            .await?
            .ok_or(AppointmentError::OrganizationNotFound)?;
        debug!("Listing appointments for organization {}", organization.id);

        let mut query = StoreQuery::new().eq("organization_id", organization.id.to_string());
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }
        if let Some(date) = date {
            query = query.eq("appointment_date", date.to_string());
        }
        query = query
            .sort_asc("appointment_date")
            .sort_asc("appointment_time")
            .sort_asc("queue_position");

        let appointments = self.fetch(&query).await?;

        let mut users: HashMap<String, UserSummary> = HashMap::new();
        let mut details = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            if !users.contains_key(&appointment.user_id) {
                let summary = self.organizations.get_user_summary(&appointment.user_id).await;
                users.insert(appointment.user_id.clone(), summary);
            }
            details.push(AppointmentDetails {
                user: users.get(&appointment.user_id).cloned(),
                organization: None,
                appointment,
            });
        }

        Ok(details)
    }

    /// Live position in the day's queue, independent of the stored position.
    pub async fn get_queue_status(
        &self,
        appointment_id: &str,
        user_id: &str,
    ) -> Result<QueueStatus, AppointmentError> {
        let appointment = self.get_appointment_for(appointment_id, user_id).await?;

        if !appointment.status.is_active() {
            return Ok(QueueStatus {
                appointment_id: appointment.id,
                status: appointment.status,
                queue_position: None,
                people_ahead: 0,
                estimated_wait_time: 0,
            });
        }

        let organization: Organization = self.organizations
            .get_organization(&appointment.organization_id.to_string())
            .await?;

        let position = self.policy
            .live_rank(
                &appointment.organization_id.to_string(),
                appointment.appointment_date,
                &appointment.id.to_string(),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .unwrap_or(appointment.queue_position.max(1));

        Ok(QueueStatus {
            appointment_id: appointment.id,
            status: appointment.status,
            queue_position: Some(position),
            people_ahead: position - 1,
            estimated_wait_time: compute_estimated_wait(position, organization.appointment_duration),
        })
    }

    async fn fetch(&self, query: &StoreQuery) -> Result<Vec<Appointment>, AppointmentError> {
        self.store
            .find(APPOINTMENTS, query)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
            .into_iter()
            .map(parse_appointment)
            .collect()
    }

    async fn organization_summary(&self, organization_id: Uuid) -> Option<OrganizationSummary> {
        match self.organizations.get_organization(&organization_id.to_string()).await {
            Ok(organization) => Some(organization.summary()),
            Err(e) => {
                warn!("Could not resolve organization {}: {}", organization_id, e);
                None
            }
        }
    }
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
