// libs/appointment-cell/src/services/queue.rs
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use organization_cell::models::{is_open_at, parse_clock_time, Day, WorkingHours};
use shared_database::{format_timestamp, DynDocumentStore, StoreQuery};

use crate::models::{AppointmentStatus, APPOINTMENTS};

/// Same-day queue arithmetic over the appointment collection.
///
/// Store failures never escape this type: position falls back to 1 and
/// slot checks report the slot as taken.
#[derive(Clone)]
pub struct QueuePolicy {
    store: DynDocumentStore,
}

impl QueuePolicy {
    pub fn new(store: DynDocumentStore) -> Self {
        Self { store }
    }

    /// Next position in the organization's queue for `date`.
    pub async fn compute_queue_position(&self, organization_id: &str, date: NaiveDate) -> i32 {
        match self.store.count(APPOINTMENTS, &active_on(organization_id, date)).await {
            Ok(count) => i32::try_from(count).unwrap_or(i32::MAX - 1) + 1,
            Err(e) => {
                warn!("Queue position lookup failed for {} on {}: {}", organization_id, date, e);
                1
            }
        }
    }

    pub async fn is_slot_available(
        &self,
        organization_id: &str,
        date: NaiveDate,
        time: &str,
        expert_name: &str,
    ) -> bool {
        let query = active_on(organization_id, date)
            .eq("appointment_time", time)
            .eq("expert_name", expert_name);

        match self.store.count(APPOINTMENTS, &query).await {
            Ok(count) => count == 0,
            Err(e) => {
                warn!("Slot check failed for {} {} {}: {}", organization_id, date, time, e);
                false
            }
        }
    }

    /// 1-based rank of `appointment_id` among the active appointments of its day,
    /// read live rather than from the stored position.
    pub async fn live_rank(
        &self,
        organization_id: &str,
        date: NaiveDate,
        appointment_id: &str,
    ) -> Result<Option<i32>> {
        let query = active_on(organization_id, date).sort_asc("created_at");
        let queue = self.store.find(APPOINTMENTS, &query).await?;

        Ok(queue
            .iter()
            .position(|a| a["id"].as_str() == Some(appointment_id))
            .map(|index| index as i32 + 1))
    }

    /// Close gaps left by appointments that moved out of the queue.
    pub async fn renumber_queue(&self, organization_id: &str, date: NaiveDate) {
        match self.try_renumber(organization_id, date).await {
            Ok(0) => debug!("Queue for {} on {} already contiguous", organization_id, date),
            Ok(updated) => info!("Renumbered {} appointments for {} on {}", updated, organization_id, date),
            Err(e) => warn!("Queue renumbering for {} on {} stopped early: {}", organization_id, date, e),
        }
    }

    async fn try_renumber(&self, organization_id: &str, date: NaiveDate) -> Result<usize> {
        let query = active_on(organization_id, date).sort_asc("created_at");
        let queue = self.store.find(APPOINTMENTS, &query).await?;

        let mut updated = 0;
        for (rank, appointment) in queue.iter().enumerate() {
            let position = rank as i64 + 1;
            if appointment["queue_position"].as_i64() == Some(position) {
                continue;
            }
            let Some(id) = appointment["id"].as_str() else {
                warn!("Skipping appointment without id while renumbering");
                continue;
            };

            let patch = json!({
                "queue_position": position,
                "updated_at": format_timestamp(Utc::now()),
            });
            self.store.update_by_id(APPOINTMENTS, id, patch).await?;
            updated += 1;
        }

        Ok(updated)
    }
}

/// Minutes until service for a given position; position 1 is next.
pub fn compute_estimated_wait(queue_position: i32, duration_minutes: i32) -> i32 {
    ((queue_position - 1) * duration_minutes).max(0)
}

pub fn is_within_working_hours(working_hours: &[WorkingHours], date: NaiveDate, time: &str) -> bool {
    match parse_clock_time(time) {
        Some(minute) => is_open_at(working_hours, Day::of(date), minute),
        None => false,
    }
}

fn active_on(organization_id: &str, date: NaiveDate) -> StoreQuery {
    StoreQuery::new()
        .eq("organization_id", organization_id)
        .eq("appointment_date", date.to_string())
        .one_of("status", AppointmentStatus::ACTIVE.iter().map(|s| s.as_str()))
}
