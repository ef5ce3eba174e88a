// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use organization_cell::models::{OrganizationError, OrganizationSummary, UserSummary};

pub const APPOINTMENTS: &str = "appointments";

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: String,
    pub organization_id: Uuid,
    pub expert_name: String,
    pub service_name: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub queue_position: i32,
    #[serde(default)]
    pub estimated_wait_time: i32,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Statuses that hold a queue position and occupy a slot.
    pub const ACTIVE: [AppointmentStatus; 2] = [AppointmentStatus::Pending, AppointmentStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::InProgress => "in-progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    /// Leaving the queue closes a gap that renumbering has to fill.
    pub fn leaves_queue(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    pub fn allowed_transitions(&self) -> &'static [AppointmentStatus] {
        match self {
            AppointmentStatus::Pending => &[AppointmentStatus::InProgress, AppointmentStatus::Cancelled],
            AppointmentStatus::InProgress => &[AppointmentStatus::Completed, AppointmentStatus::Cancelled],
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "in-progress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentError::InvalidStatus(other.to_string())),
        }
    }
}

/// Appointment with display fields of the user and organization resolved.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueStatus {
    pub appointment_id: Uuid,
    pub status: AppointmentStatus,
    /// Live rank among active appointments; `None` once the appointment left the queue.
    pub queue_position: Option<i32>,
    pub people_ahead: i32,
    pub estimated_wait_time: i32,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub organization_id: Option<String>,
    pub expert_name: Option<String>,
    pub service_name: Option<String>,
    pub appointment_date: Option<String>,
    pub appointment_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<String>,
    pub date: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Please provide all required fields")]
    MissingFields,

    #[error("Invalid appointment time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("Invalid appointment date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Organization not found")]
    OrganizationNotFound,

    #[error("Appointment not found")]
    NotFound,

    #[error("Cannot book appointments in the past")]
    PastDate,

    #[error("Organization is closed or outside working hours at the requested time")]
    OutsideWorkingHours,

    #[error("Expert not found")]
    ExpertNotFound,

    #[error("Expert is not available")]
    ExpertUnavailable,

    #[error("This time slot is already booked")]
    SlotTaken,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Status is required")]
    MissingStatus,

    #[error("Invalid status '{0}'")]
    InvalidStatus(String),

    #[error("Cannot change status from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot cancel a completed appointment")]
    CannotCancelCompleted,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<OrganizationError> for AppointmentError {
    fn from(e: OrganizationError) -> Self {
        match e {
            OrganizationError::NotFound => AppointmentError::OrganizationNotFound,
            OrganizationError::DatabaseError(msg) => AppointmentError::DatabaseError(msg),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}
