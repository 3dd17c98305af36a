use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A billable service from the clinic price list.
///
/// `price` is in currency minor-unit-free rubles; `duration_minutes` is the
/// standard execution time used by the UI to suggest an end time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub duration_minutes: i64,
}
