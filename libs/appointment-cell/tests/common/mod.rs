#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Value};

use appointment_cell::models::{Appointment, BookAppointmentRequest};
use appointment_cell::services::AppointmentBookingService;
use shared_database::{DocumentStore, DynDocumentStore, InMemoryStore};
use shared_utils::test_utils::MockDocuments;

pub const OWNER: &str = "owner-1";

/// Sunday; the Monday after it is the first bookable weekday in fixtures.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub struct Fixture {
    pub store: DynDocumentStore,
    pub organization_id: String,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_organization(MockDocuments::organization(OWNER, "City Clinic")).await
    }

    pub async fn with_organization(organization: Value) -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()), organization).await
    }

    pub async fn with_store(store: DynDocumentStore, organization: Value) -> Self {
        let created = store.insert("organizations", organization).await.unwrap();
        let organization_id = created["id"].as_str().unwrap().to_string();
        Self { store, organization_id }
    }

    pub async fn add_user_profile(&self, user_id: &str, name: &str) {
        self.store.insert("users", MockDocuments::user_profile(user_id, name)).await.unwrap();
    }

    pub fn request(&self, date: NaiveDate, time: &str) -> BookAppointmentRequest {
        BookAppointmentRequest {
            organization_id: Some(self.organization_id.clone()),
            expert_name: Some("Dr. A".to_string()),
            service_name: Some("Consultation".to_string()),
            appointment_date: Some(date.to_string()),
            appointment_time: Some(time.to_string()),
            notes: None,
        }
    }

    pub async fn book(&self, user_id: &str, time: &str) -> Appointment {
        AppointmentBookingService::new(self.store.clone())
            .book_appointment_on(user_id, self.request(monday(), time), today())
            .await
            .unwrap()
            .appointment
    }

    pub async fn stored(&self, appointment: &Appointment) -> Appointment {
        let document = self.store
            .find_by_id("appointments", &appointment.id.to_string())
            .await
            .unwrap()
            .unwrap();
        serde_json::from_value(document).unwrap()
    }
}

pub fn organization_with_unavailable_expert() -> Value {
    let mut organization = MockDocuments::organization(OWNER, "City Clinic");
    organization["experts"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "name": "Dr. B", "specialization": "Dental", "available": false }));
    organization
}
