// libs/organization-cell/src/services/analytics.rs
use chrono::{Local, NaiveDate};
use tracing::debug;

use shared_database::{DynDocumentStore, StoreQuery};

use crate::models::{OrganizationAnalytics, OrganizationError, StatusCounts, TodayStats};
use crate::services::organization::OrganizationService;

/// Appointment rows as written by the appointment cell.
const APPOINTMENTS: &str = "appointments";

pub struct OrganizationAnalyticsService {
    store: DynDocumentStore,
    organizations: OrganizationService,
}

impl OrganizationAnalyticsService {
    pub fn new(store: DynDocumentStore) -> Self {
        Self {
            organizations: OrganizationService::new(store.clone()),
            store,
        }
    }

    /// Analytics for the organization owned by `user_id`, with "today" in local time.
    pub async fn get_analytics(&self, user_id: &str) -> Result<OrganizationAnalytics, OrganizationError> {
        let organization = self.organizations.get_organization_for_owner(user_id).await?;
        self.analytics_for(&organization.id.to_string(), Local::now().date_naive()).await
    }

    pub async fn analytics_for(
        &self,
        organization_id: &str,
        today: NaiveDate,
    ) -> Result<OrganizationAnalytics, OrganizationError> {
        debug!("Computing analytics for organization {} on {}", organization_id, today);

        let all = StoreQuery::new().eq("organization_id", organization_id);
        let today_str = today.format("%Y-%m-%d").to_string();
        let on_today = all.clone().eq("appointment_date", today_str.as_str());
        let with_status = |base: &StoreQuery, status: &str| base.clone().eq("status", status);
        let today_completed_q = with_status(&on_today, "completed");
        let today_pending_q = with_status(&on_today, "pending");
        let pending_q = with_status(&all, "pending");
        let in_progress_q = with_status(&all, "in-progress");
        let completed_q = with_status(&all, "completed");
        let cancelled_q = with_status(&all, "cancelled");

        let (
            total_appointments,
            today_total,
            today_completed,
            today_pending,
            pending,
            in_progress,
            completed,
            cancelled,
        ) = tokio::try_join!(
            self.count(&all),
            self.count(&on_today),
            self.count(&today_completed_q),
            self.count(&today_pending_q),
            self.count(&pending_q),
            self.count(&in_progress_q),
            self.count(&completed_q),
            self.count(&cancelled_q),
        )?;

        Ok(OrganizationAnalytics {
            total_appointments,
            today: TodayStats {
                total: today_total,
                completed: today_completed,
                pending: today_pending,
            },
            by_status: StatusCounts {
                pending,
                in_progress,
                completed,
                cancelled,
            },
        })
    }

    async fn count(&self, query: &StoreQuery) -> Result<u64, OrganizationError> {
        self.store
            .count(APPOINTMENTS, query)
            .await
            .map_err(|e| OrganizationError::DatabaseError(e.to_string()))
    }
}
