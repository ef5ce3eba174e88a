mod common;

use std::sync::Arc;

use anyhow::anyhow;
use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use appointment_cell::models::{AppointmentError, AppointmentStatus, BookAppointmentRequest};
use appointment_cell::services::{AppointmentBookingService, AppointmentLifecycleService, QueuePolicy};
use shared_database::{DocumentStore, DynDocumentStore, StoreQuery};

use common::{monday, organization_with_unavailable_expert, today, Fixture, OWNER};

#[tokio::test]
async fn first_booking_of_the_day_is_next_in_line() {
    let fixture = Fixture::new().await;
    fixture.add_user_profile("user-1", "Jane Doe").await;
    let service = AppointmentBookingService::new(fixture.store.clone());

    let details = service
        .book_appointment_on("user-1", fixture.request(monday(), "09:00"), today())
        .await
        .unwrap();

    assert_eq!(details.appointment.queue_position, 1);
    assert_eq!(details.appointment.estimated_wait_time, 0);
    assert_eq!(details.appointment.status, AppointmentStatus::Pending);
    assert_eq!(details.appointment.appointment_date, monday());
    assert_eq!(details.user.unwrap().name.as_deref(), Some("Jane Doe"));
    assert_eq!(details.organization.unwrap().name, "City Clinic");
}

#[tokio::test]
async fn taken_slot_is_rejected_and_next_slot_waits() {
    let fixture = Fixture::new().await;
    let service = AppointmentBookingService::new(fixture.store.clone());
    fixture.book("user-1", "09:00").await;

    let duplicate = service
        .book_appointment_on("user-2", fixture.request(monday(), "09:00"), today())
        .await;
    assert_matches!(duplicate, Err(AppointmentError::SlotTaken));

    let second = service
        .book_appointment_on("user-2", fixture.request(monday(), "09:30"), today())
        .await
        .unwrap();
    assert_eq!(second.appointment.queue_position, 2);
    assert_eq!(second.appointment.estimated_wait_time, 30);
}

#[tokio::test]
async fn cancelled_slot_can_be_booked_again() {
    let fixture = Fixture::new().await;
    let first = fixture.book("user-1", "09:00").await;
    AppointmentLifecycleService::new(fixture.store.clone(), true)
        .cancel_appointment(&first.id.to_string(), "user-1")
        .await
        .unwrap();

    let again = fixture.book("user-2", "09:00").await;
    assert_eq!(again.queue_position, 1);
}

#[tokio::test]
async fn bookings_outside_working_hours_are_rejected() {
    let fixture = Fixture::new().await;
    let service = AppointmentBookingService::new(fixture.store.clone());

    let early = service
        .book_appointment_on("user-1", fixture.request(monday(), "08:59"), today())
        .await;
    assert_matches!(early, Err(AppointmentError::OutsideWorkingHours));

    let closing = service
        .book_appointment_on("user-1", fixture.request(monday(), "17:00"), today())
        .await;
    assert!(closing.is_ok());

    let tuesday = monday().succ_opt().unwrap();
    let closed_day = service
        .book_appointment_on("user-1", fixture.request(tuesday, "10:00"), today())
        .await;
    assert_matches!(closed_day, Err(AppointmentError::OutsideWorkingHours));
}

#[tokio::test]
async fn past_dates_are_rejected_before_hours_are_checked() {
    let fixture = Fixture::new().await;
    let service = AppointmentBookingService::new(fixture.store.clone());
    let last_monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();

    let result = service
        .book_appointment_on("user-1", fixture.request(last_monday, "03:00"), today())
        .await;
    assert_matches!(result, Err(AppointmentError::PastDate));

    // Same-day bookings are allowed whatever the time of day.
    let same_day = service
        .book_appointment_on("user-1", fixture.request(monday(), "09:00"), monday())
        .await;
    assert!(same_day.is_ok());
}

#[tokio::test]
async fn incomplete_or_malformed_requests_are_rejected() {
    let fixture = Fixture::new().await;
    let service = AppointmentBookingService::new(fixture.store.clone());

    let empty = service
        .book_appointment_on("user-1", BookAppointmentRequest::default(), today())
        .await;
    assert_matches!(empty, Err(AppointmentError::MissingFields));

    let mut blank_expert = fixture.request(monday(), "09:00");
    blank_expert.expert_name = Some("   ".to_string());
    let result = service.book_appointment_on("user-1", blank_expert, today()).await;
    assert_matches!(result, Err(AppointmentError::MissingFields));

    let result = service
        .book_appointment_on("user-1", fixture.request(monday(), "9am"), today())
        .await;
    assert_matches!(result, Err(AppointmentError::InvalidTime(_)));

    let mut bad_date = fixture.request(monday(), "09:00");
    bad_date.appointment_date = Some("19/10/2026".to_string());
    let result = service.book_appointment_on("user-1", bad_date, today()).await;
    assert_matches!(result, Err(AppointmentError::InvalidDate(_)));

    let mut unknown = fixture.request(monday(), "09:00");
    unknown.organization_id = Some(Uuid::new_v4().to_string());
    let result = service.book_appointment_on("user-1", unknown, today()).await;
    assert_matches!(result, Err(AppointmentError::OrganizationNotFound));

    let mut not_an_id = fixture.request(monday(), "09:00");
    not_an_id.organization_id = Some("city-clinic".to_string());
    let result = service.book_appointment_on("user-1", not_an_id, today()).await;
    assert_matches!(result, Err(AppointmentError::OrganizationNotFound));
}

#[tokio::test]
async fn expert_must_be_on_roster_and_available() {
    let fixture = Fixture::with_organization(organization_with_unavailable_expert()).await;
    let service = AppointmentBookingService::new(fixture.store.clone());

    let mut unknown = fixture.request(monday(), "10:00");
    unknown.expert_name = Some("Dr. Z".to_string());
    let result = service.book_appointment_on("user-1", unknown, today()).await;
    assert_matches!(result, Err(AppointmentError::ExpertNotFound));

    let mut unavailable = fixture.request(monday(), "10:00");
    unavailable.expert_name = Some("Dr. B".to_string());
    let result = service.book_appointment_on("user-1", unavailable, today()).await;
    assert_matches!(result, Err(AppointmentError::ExpertUnavailable));
}

#[tokio::test]
async fn appointment_visible_to_booker_and_organization_only() {
    let fixture = Fixture::new().await;
    let service = AppointmentBookingService::new(fixture.store.clone());
    let appointment = fixture.book("user-1", "09:00").await;
    let id = appointment.id.to_string();

    assert!(service.get_appointment_for(&id, "user-1").await.is_ok());
    assert!(service.get_appointment_for(&id, OWNER).await.is_ok());
    assert_matches!(
        service.get_appointment_for(&id, "user-2").await,
        Err(AppointmentError::Unauthorized)
    );
    assert_matches!(
        service.get_appointment_for(&Uuid::new_v4().to_string(), "user-1").await,
        Err(AppointmentError::NotFound)
    );
}

#[tokio::test]
async fn user_listing_is_most_recent_first() {
    let fixture = Fixture::new().await;
    let service = AppointmentBookingService::new(fixture.store.clone());
    let next_monday = monday() + chrono::Duration::days(7);

    fixture.book("user-1", "09:00").await;
    fixture.book("user-1", "11:00").await;
    service
        .book_appointment_on("user-1", fixture.request(next_monday, "10:00"), today())
        .await
        .unwrap();
    fixture.book("user-2", "10:00").await;

    let listed = service.list_user_appointments("user-1", None).await.unwrap();
    let order: Vec<(NaiveDate, &str)> = listed
        .iter()
        .map(|d| (d.appointment.appointment_date, d.appointment.appointment_time.as_str()))
        .collect();
    assert_eq!(order, vec![(next_monday, "10:00"), (monday(), "11:00"), (monday(), "09:00")]);
    assert!(listed.iter().all(|d| d.organization.as_ref().map(|o| o.name.as_str()) == Some("City Clinic")));

    let cancelled = service
        .list_user_appointments("user-1", Some(AppointmentStatus::Cancelled))
        .await
        .unwrap();
    assert!(cancelled.is_empty());
}

#[tokio::test]
async fn organization_listing_follows_queue_order() {
    let fixture = Fixture::new().await;
    fixture.add_user_profile("user-2", "Sam Roe").await;
    let service = AppointmentBookingService::new(fixture.store.clone());

    fixture.book("user-1", "11:00").await;
    fixture.book("user-2", "09:00").await;

    let listed = service
        .list_organization_appointments(OWNER, None, Some(monday()))
        .await
        .unwrap();
    let times: Vec<&str> = listed.iter().map(|d| d.appointment.appointment_time.as_str()).collect();
    assert_eq!(times, vec!["09:00", "11:00"]);
    assert_eq!(listed[0].user.as_ref().and_then(|u| u.name.as_deref()), Some("Sam Roe"));
    assert_eq!(listed[1].user.as_ref().map(|u| u.id.as_str()), Some("user-1"));

    let other_day = service
        .list_organization_appointments(OWNER, None, Some(today()))
        .await
        .unwrap();
    assert!(other_day.is_empty());

    assert_matches!(
        service.list_organization_appointments("not-an-owner", None, None).await,
        Err(AppointmentError::OrganizationNotFound)
    );
}

/// Store whose every call fails, for exercising the policy fallbacks.
struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn insert(&self, _: &str, _: Value) -> anyhow::Result<Value> {
        Err(anyhow!("store offline"))
    }
    async fn find_by_id(&self, _: &str, _: &str) -> anyhow::Result<Option<Value>> {
        Err(anyhow!("store offline"))
    }
    async fn find(&self, _: &str, _: &StoreQuery) -> anyhow::Result<Vec<Value>> {
        Err(anyhow!("store offline"))
    }
    async fn count(&self, _: &str, _: &StoreQuery) -> anyhow::Result<u64> {
        Err(anyhow!("store offline"))
    }
    async fn update_by_id(&self, _: &str, _: &str, _: Value) -> anyhow::Result<Option<Value>> {
        Err(anyhow!("store offline"))
    }
    async fn save(&self, _: &str, _: Value) -> anyhow::Result<Value> {
        Err(anyhow!("store offline"))
    }
}

#[tokio::test]
async fn policy_degrades_to_safe_defaults_when_store_fails() {
    let store: DynDocumentStore = Arc::new(FailingStore);
    let policy = QueuePolicy::new(store.clone());

    assert_eq!(policy.compute_queue_position("org-1", monday()).await, 1);
    assert!(!policy.is_slot_available("org-1", monday(), "09:00", "Dr. A").await);
    policy.renumber_queue("org-1", monday()).await;

    let service = AppointmentBookingService::new(store);
    let result = service.get_appointment(&Uuid::new_v4().to_string()).await;
    assert_matches!(result, Err(AppointmentError::DatabaseError(_)));
}
