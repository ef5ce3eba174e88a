use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;

use organization_cell::models::*;
use organization_cell::services::{OrganizationAnalyticsService, OrganizationService};
use shared_database::{DocumentStore, DynDocumentStore, InMemoryStore};

fn store() -> DynDocumentStore {
    Arc::new(InMemoryStore::new())
}

fn clinic_request() -> CreateOrganizationRequest {
    CreateOrganizationRequest {
        name: Some("City Clinic".to_string()),
        category: Some(OrganizationCategory::Clinic),
        working_hours: Some(vec![WorkingHours {
            day: Day::Monday,
            start_time: "09:00".to_string(),
            end_time: "17:00".to_string(),
            is_open: true,
        }]),
        experts: Some(vec![Expert {
            name: "Dr. A".to_string(),
            specialization: Some("General".to_string()),
            available: true,
        }]),
        ..Default::default()
    }
}

#[tokio::test]
async fn create_applies_defaults_and_enforces_one_per_user() {
    let service = OrganizationService::new(store());

    let created = service
        .create_organization("owner-1", CreateOrganizationRequest {
            name: Some("Corner Bank".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(created.user_id, "owner-1");
    assert_eq!(created.appointment_duration, 30);
    assert_eq!(created.category, OrganizationCategory::Other);

    let again = service.create_organization("owner-1", clinic_request()).await;
    assert_matches!(again, Err(OrganizationError::AlreadyExists));
}

#[tokio::test]
async fn create_validates_schema() {
    let service = OrganizationService::new(store());

    let nameless = service.create_organization("owner-1", CreateOrganizationRequest::default()).await;
    assert_matches!(nameless, Err(OrganizationError::ValidationError(_)));

    let too_long = service
        .create_organization("owner-1", CreateOrganizationRequest {
            appointment_duration: Some(241),
            ..clinic_request()
        })
        .await;
    assert_matches!(too_long, Err(OrganizationError::ValidationError(msg)) if msg.contains("between 5 and 240"));

    let bad_hours = service
        .create_organization("owner-1", CreateOrganizationRequest {
            working_hours: Some(vec![WorkingHours {
                day: Day::Tuesday,
                start_time: "9am".to_string(),
                end_time: "17:00".to_string(),
                is_open: true,
            }]),
            ..clinic_request()
        })
        .await;
    assert_matches!(bad_hours, Err(OrganizationError::ValidationError(_)));
}

#[tokio::test]
async fn update_is_partial_owner_only_and_revalidated() {
    let service = OrganizationService::new(store());
    let created = service.create_organization("owner-1", clinic_request()).await.unwrap();
    let id = created.id.to_string();

    let updated = service
        .update_organization(&id, "owner-1", UpdateOrganizationRequest {
            phone: Some("555-0199".to_string()),
            appointment_duration: Some(15),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.phone.as_deref(), Some("555-0199"));
    assert_eq!(updated.appointment_duration, 15);
    assert_eq!(updated.name, "City Clinic");
    assert_eq!(updated.experts.len(), 1);

    let stranger = service
        .update_organization(&id, "someone-else", UpdateOrganizationRequest::default())
        .await;
    assert_matches!(stranger, Err(OrganizationError::NotOwner));

    let invalid = service
        .update_organization(&id, "owner-1", UpdateOrganizationRequest {
            appointment_duration: Some(4),
            ..Default::default()
        })
        .await;
    assert_matches!(invalid, Err(OrganizationError::ValidationError(_)));

    let stored = service.get_organization(&id).await.unwrap();
    assert_eq!(stored.appointment_duration, 15);
}

#[tokio::test]
async fn lookup_by_owner_and_missing_ids() {
    let service = OrganizationService::new(store());
    service.create_organization("owner-1", clinic_request()).await.unwrap();

    assert!(service.find_by_owner("owner-1").await.unwrap().is_some());
    assert!(service.find_by_owner("owner-2").await.unwrap().is_none());
    assert_matches!(service.get_organization_for_owner("owner-2").await, Err(OrganizationError::NotFound));
    assert_matches!(
        service.get_organization("00000000-0000-0000-0000-000000000000").await,
        Err(OrganizationError::NotFound)
    );
}

#[tokio::test]
async fn discovery_filters_by_category_and_name() {
    let service = OrganizationService::new(store());
    service.create_organization("o1", clinic_request()).await.unwrap();
    service
        .create_organization("o2", CreateOrganizationRequest {
            name: Some("Alpha Savings Bank".to_string()),
            category: Some(OrganizationCategory::Bank),
            ..Default::default()
        })
        .await
        .unwrap();
    service
        .create_organization("o3", CreateOrganizationRequest {
            name: Some("Beta Bank".to_string()),
            category: Some(OrganizationCategory::Bank),
            ..Default::default()
        })
        .await
        .unwrap();

    let banks = service
        .list_organizations(OrganizationSearchQuery {
            category: Some(OrganizationCategory::Bank),
            search: None,
        })
        .await
        .unwrap();
    let names: Vec<&str> = banks.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha Savings Bank", "Beta Bank"]);

    let clinics = service
        .list_organizations(OrganizationSearchQuery {
            category: None,
            search: Some("CLINIC".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(clinics.len(), 1);
    assert_eq!(clinics[0].name, "City Clinic");
}

#[tokio::test]
async fn user_summary_falls_back_to_id() {
    let store = store();
    store
        .insert(USERS, json!({ "id": "u-1", "name": "Ada", "email": "ada@example.com" }))
        .await
        .unwrap();
    let service = OrganizationService::new(store);

    let known = service.get_user_summary("u-1").await;
    assert_eq!(known.name.as_deref(), Some("Ada"));

    let unknown = service.get_user_summary("u-2").await;
    assert_eq!(unknown, UserSummary::unresolved("u-2"));
}

#[tokio::test]
async fn analytics_counts_each_bucket_independently() {
    let store = store();
    let organizations = OrganizationService::new(store.clone());
    let org = organizations.create_organization("owner-1", clinic_request()).await.unwrap();
    let org_id = org.id.to_string();

    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let rows = [
        ("2026-10-19", "pending"),
        ("2026-10-19", "pending"),
        ("2026-10-19", "completed"),
        ("2026-10-19", "in-progress"),
        ("2026-10-20", "pending"),
        ("2026-10-12", "cancelled"),
    ];
    for (date, status) in rows {
        store
            .insert("appointments", json!({
                "organization_id": org_id,
                "appointment_date": date,
                "status": status
            }))
            .await
            .unwrap();
    }
    store
        .insert("appointments", json!({
            "organization_id": "another-org",
            "appointment_date": "2026-10-19",
            "status": "pending"
        }))
        .await
        .unwrap();

    let analytics = OrganizationAnalyticsService::new(store)
        .analytics_for(&org_id, today)
        .await
        .unwrap();

    assert_eq!(analytics.total_appointments, 6);
    assert_eq!(analytics.today, TodayStats { total: 4, completed: 1, pending: 2 });
    assert_eq!(analytics.by_status, StatusCounts {
        pending: 3,
        in_progress: 1,
        completed: 1,
        cancelled: 1,
    });
}
