use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One booked visit. `cabinet` and `total_sum` are snapshots taken at the
/// last successful write: later edits to the doctor's cabinet or the service
/// price list do not reach back into existing rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_snils: String,
    pub date: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub cabinet: i32,
    pub total_sum: i64,
}

/// Join row tying an appointment to one of its services.
/// Lives and dies with its appointment; `price` is the service price as it
/// stood when the appointment was last written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentService {
    pub appointment_id: Uuid,
    pub service_id: Uuid,
    pub price: i64,
}
