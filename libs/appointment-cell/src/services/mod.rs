pub mod booking;
pub mod lifecycle;
pub mod queue;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use queue::QueuePolicy;

use serde_json::{json, Value};

use shared_database::{format_timestamp, DynDocumentStore};

use crate::models::{Appointment, AppointmentError, APPOINTMENTS};

pub(crate) async fn load_appointment(
    store: &DynDocumentStore,
    appointment_id: &str,
) -> Result<Appointment, AppointmentError> {
    let document = store
        .find_by_id(APPOINTMENTS, appointment_id)
        .await
        .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?
        .ok_or(AppointmentError::NotFound)?;

    parse_appointment(document)
}

pub(crate) fn to_document(appointment: &Appointment) -> Value {
    let mut document = json!(appointment);
    if let Some(object) = document.as_object_mut() {
        object.insert("created_at".to_string(), json!(format_timestamp(appointment.created_at)));
        object.insert("updated_at".to_string(), json!(format_timestamp(appointment.updated_at)));
    }
    document
}

pub(crate) fn parse_appointment(document: Value) -> Result<Appointment, AppointmentError> {
    serde_json::from_value(document)
        .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
}
