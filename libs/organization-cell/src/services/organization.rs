// libs/organization-cell/src/services/organization.rs
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{format_timestamp, DynDocumentStore, StoreQuery};

use crate::models::{
    CreateOrganizationRequest, Organization, OrganizationError, OrganizationSearchQuery,
    UpdateOrganizationRequest, UserSummary, DEFAULT_APPOINTMENT_DURATION, ORGANIZATIONS, USERS,
};

pub struct OrganizationService {
    store: DynDocumentStore,
}

impl OrganizationService {
    pub fn new(store: DynDocumentStore) -> Self {
        Self { store }
    }

    /// Create the acting user's organization. One organization per user.
    pub async fn create_organization(
        &self,
        user_id: &str,
        request: CreateOrganizationRequest,
    ) -> Result<Organization, OrganizationError> {
        debug!("Creating organization for user {}", user_id);

        if self.find_by_owner(user_id).await?.is_some() {
            return Err(OrganizationError::AlreadyExists);
        }

        let now = Utc::now();
        let organization = Organization {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            name: request.name.unwrap_or_default(),
            description: request.description,
            category: request.category.unwrap_or_default(),
            address: request.address,
            phone: request.phone,
            appointment_duration: request.appointment_duration.unwrap_or(DEFAULT_APPOINTMENT_DURATION),
            working_hours: request.working_hours.unwrap_or_default(),
            experts: request.experts.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        organization.validate()?;

        let created = self.store
            .insert(ORGANIZATIONS, to_document(&organization))
            .await
            .map_err(|e| OrganizationError::DatabaseError(e.to_string()))?;

        let organization = parse_organization(created)?;
        info!("Organization {} created for user {}", organization.id, user_id);
        Ok(organization)
    }

    pub async fn get_organization(&self, organization_id: &str) -> Result<Organization, OrganizationError> {
        debug!("Fetching organization: {}", organization_id);

        let document = self.store
            .find_by_id(ORGANIZATIONS, organization_id)
            .await
            .map_err(|e| OrganizationError::DatabaseError(e.to_string()))?
            .ok_or(OrganizationError::NotFound)?;

        parse_organization(document)
    }

    pub async fn find_by_owner(&self, user_id: &str) -> Result<Option<Organization>, OrganizationError> {
        let query = StoreQuery::new().eq("user_id", user_id).limit(1);
        let rows = self.store
            .find(ORGANIZATIONS, &query)
            .await
            .map_err(|e| OrganizationError::DatabaseError(e.to_string()))?;

        rows.into_iter().next().map(parse_organization).transpose()
    }

    pub async fn get_organization_for_owner(&self, user_id: &str) -> Result<Organization, OrganizationError> {
        self.find_by_owner(user_id).await?.ok_or(OrganizationError::NotFound)
    }

    /// Partial replacement by the owner, re-validated before it is saved.
    pub async fn update_organization(
        &self,
        organization_id: &str,
        user_id: &str,
        request: UpdateOrganizationRequest,
    ) -> Result<Organization, OrganizationError> {
        debug!("Updating organization {} for user {}", organization_id, user_id);

        let mut organization = self.get_organization(organization_id).await?;
        if organization.user_id != user_id {
            return Err(OrganizationError::NotOwner);
        }

        request.apply_to(&mut organization);
        organization.updated_at = Utc::now();
        organization.validate()?;

        let saved = self.store
            .save(ORGANIZATIONS, to_document(&organization))
            .await
            .map_err(|e| OrganizationError::DatabaseError(e.to_string()))?;

        info!("Organization {} updated", organization.id);
        parse_organization(saved)
    }

    /// Discovery listing, sorted by name.
    pub async fn list_organizations(
        &self,
        query: OrganizationSearchQuery,
    ) -> Result<Vec<Organization>, OrganizationError> {
        debug!("Listing organizations with filters: {:?}", query);

        let mut store_query = StoreQuery::new();
        if let Some(category) = query.category {
            store_query = store_query.eq("category", category.to_string());
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            store_query = store_query.contains("name", search);
        }
        store_query = store_query.sort_asc("name");

        let rows = self.store
            .find(ORGANIZATIONS, &store_query)
            .await
            .map_err(|e| OrganizationError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(parse_organization).collect()
    }

    /// Display profile for a user; falls back to the bare id when no profile is stored.
    pub async fn get_user_summary(&self, user_id: &str) -> UserSummary {
        match self.store.find_by_id(USERS, user_id).await {
            Ok(Some(document)) => serde_json::from_value(document)
                .unwrap_or_else(|_| UserSummary::unresolved(user_id)),
            Ok(None) => UserSummary::unresolved(user_id),
            Err(e) => {
                debug!("User profile lookup failed for {}: {}", user_id, e);
                UserSummary::unresolved(user_id)
            }
        }
    }
}

fn to_document(organization: &Organization) -> Value {
    let mut document = json!(organization);
    if let Some(object) = document.as_object_mut() {
        object.insert("created_at".to_string(), json!(format_timestamp(organization.created_at)));
        object.insert("updated_at".to_string(), json!(format_timestamp(organization.updated_at)));
    }
    document
}

fn parse_organization(document: Value) -> Result<Organization, OrganizationError> {
    serde_json::from_value(document)
        .map_err(|e| OrganizationError::DatabaseError(format!("Failed to parse organization: {}", e)))
}
