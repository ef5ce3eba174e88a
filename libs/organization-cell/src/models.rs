// libs/organization-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ORGANIZATIONS: &str = "organizations";
pub const USERS: &str = "users";

pub const DEFAULT_APPOINTMENT_DURATION: i32 = 30;
pub const MIN_APPOINTMENT_DURATION: i32 = 5;
pub const MAX_APPOINTMENT_DURATION: i32 = 240;

// ==============================================================================
// ORGANIZATION RECORD
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: OrganizationCategory,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default = "default_duration")]
    pub appointment_duration: i32,
    #[serde(default)]
    pub working_hours: Vec<WorkingHours>,
    #[serde(default)]
    pub experts: Vec<Expert>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_duration() -> i32 {
    DEFAULT_APPOINTMENT_DURATION
}

impl Organization {
    /// First roster entry with this exact name. Names are the only expert identity.
    pub fn find_expert(&self, name: &str) -> Option<&Expert> {
        self.experts.iter().find(|e| e.name == name)
    }

    pub fn is_open_at(&self, at: NaiveDateTime) -> bool {
        let minutes = at.time().hour() * 60 + at.time().minute();
        is_open_at(&self.working_hours, Day::from(at.weekday()), minutes)
    }

    pub fn is_currently_open(&self) -> bool {
        self.is_open_at(Local::now().naive_local())
    }

    /// Schema checks applied on create and on every update.
    pub fn validate(&self) -> Result<(), OrganizationError> {
        if self.name.trim().is_empty() {
            return Err(OrganizationError::ValidationError("Organization name is required".to_string()));
        }

        if !(MIN_APPOINTMENT_DURATION..=MAX_APPOINTMENT_DURATION).contains(&self.appointment_duration) {
            return Err(OrganizationError::ValidationError(format!(
                "Appointment duration must be between {} and {} minutes",
                MIN_APPOINTMENT_DURATION, MAX_APPOINTMENT_DURATION
            )));
        }

        for entry in &self.working_hours {
            if parse_clock_time(&entry.start_time).is_none() || parse_clock_time(&entry.end_time).is_none() {
                return Err(OrganizationError::ValidationError(format!(
                    "Working hours for {} must use HH:MM times",
                    entry.day
                )));
            }
        }

        if self.experts.iter().any(|e| e.name.trim().is_empty()) {
            return Err(OrganizationError::ValidationError("Expert name is required".to_string()));
        }

        Ok(())
    }

    pub fn summary(&self) -> OrganizationSummary {
        OrganizationSummary {
            id: self.id,
            name: self.name.clone(),
            category: self.category.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Organization as returned to clients, with the derived open flag.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationView {
    #[serde(flatten)]
    pub organization: Organization,
    pub is_currently_open: bool,
}

impl From<Organization> for OrganizationView {
    fn from(organization: Organization) -> Self {
        let is_currently_open = organization.is_currently_open();
        Self { organization, is_currently_open }
    }
}

/// Display fields embedded in appointment responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub category: OrganizationCategory,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrganizationCategory {
    Hospital,
    Clinic,
    Bank,
    #[serde(rename = "Service Center")]
    ServiceCenter,
    #[serde(rename = "Government Office")]
    GovernmentOffice,
    #[default]
    Other,
}

impl fmt::Display for OrganizationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizationCategory::Hospital => write!(f, "Hospital"),
            OrganizationCategory::Clinic => write!(f, "Clinic"),
            OrganizationCategory::Bank => write!(f, "Bank"),
            OrganizationCategory::ServiceCenter => write!(f, "Service Center"),
            OrganizationCategory::GovernmentOffice => write!(f, "Government Office"),
            OrganizationCategory::Other => write!(f, "Other"),
        }
    }
}

// ==============================================================================
// WORKING HOURS & EXPERTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for Day {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => Day::Monday,
            Weekday::Tue => Day::Tuesday,
            Weekday::Wed => Day::Wednesday,
            Weekday::Thu => Day::Thursday,
            Weekday::Fri => Day::Friday,
            Weekday::Sat => Day::Saturday,
            Weekday::Sun => Day::Sunday,
        }
    }
}

impl Day {
    pub fn of(date: NaiveDate) -> Self {
        Day::from(date.weekday())
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingHours {
    pub day: Day,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_true")]
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expert {
    pub name: String,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_true() -> bool {
    true
}

/// Minutes since midnight for a strict `HH:MM` string.
pub fn parse_clock_time(value: &str) -> Option<u32> {
    if value.len() != 5 || value.as_bytes()[2] != b':' {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .ok()
        .map(|t| t.hour() * 60 + t.minute())
}

/// First entry for `day` that is marked open. Later entries for the same day are ignored.
pub fn open_entry_for(working_hours: &[WorkingHours], day: Day) -> Option<&WorkingHours> {
    working_hours.iter().find(|entry| entry.day == day && entry.is_open)
}

/// Inclusive at both ends: a minute equal to the closing time is still open.
pub fn is_open_at(working_hours: &[WorkingHours], day: Day, minute_of_day: u32) -> bool {
    let Some(entry) = open_entry_for(working_hours, day) else {
        return false;
    };

    match (parse_clock_time(&entry.start_time), parse_clock_time(&entry.end_time)) {
        (Some(start), Some(end)) => start <= minute_of_day && minute_of_day <= end,
        _ => false,
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<OrganizationCategory>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub appointment_duration: Option<i32>,
    pub working_hours: Option<Vec<WorkingHours>>,
    pub experts: Option<Vec<Expert>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<OrganizationCategory>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub appointment_duration: Option<i32>,
    pub working_hours: Option<Vec<WorkingHours>>,
    pub experts: Option<Vec<Expert>>,
}

impl UpdateOrganizationRequest {
    /// Replaces every field present in the request.
    pub fn apply_to(self, organization: &mut Organization) {
        if let Some(name) = self.name {
            organization.name = name;
        }
        if let Some(description) = self.description {
            organization.description = Some(description);
        }
        if let Some(category) = self.category {
            organization.category = category;
        }
        if let Some(address) = self.address {
            organization.address = Some(address);
        }
        if let Some(phone) = self.phone {
            organization.phone = Some(phone);
        }
        if let Some(duration) = self.appointment_duration {
            organization.appointment_duration = duration;
        }
        if let Some(working_hours) = self.working_hours {
            organization.working_hours = working_hours;
        }
        if let Some(experts) = self.experts {
            organization.experts = experts;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationSearchQuery {
    pub category: Option<OrganizationCategory>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl UserSummary {
    pub fn unresolved(id: &str) -> Self {
        Self { id: id.to_string(), name: None, email: None, phone: None }
    }
}

// ==============================================================================
// ANALYTICS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrganizationAnalytics {
    pub total_appointments: u64,
    pub today: TodayStats,
    pub by_status: StatusCounts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TodayStats {
    pub total: u64,
    pub completed: u64,
    pub pending: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusCounts {
    pub pending: u64,
    #[serde(rename = "in-progress")]
    pub in_progress: u64,
    pub completed: u64,
    pub cancelled: u64,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrganizationError {
    #[error("Organization not found")]
    NotFound,

    #[error("Organization already exists for this user")]
    AlreadyExists,

    #[error("Not authorized to manage this organization")]
    NotOwner,

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
