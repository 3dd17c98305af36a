//! Scheduling engine — conflict checking and the appointment ledger.
//!
//! The ledger is the only writer of appointment and link rows. Every write
//! runs the conflict check and the mutation inside one IMMEDIATE transaction,
//! so two callers racing for the same (doctor, date) slot are serialized by
//! SQLite's write lock and exactly one of them commits.

pub mod conflict;
pub mod ledger;

pub use conflict::*;
pub use ledger::*;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

/// Half-open `[start, end)` interval within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Half-open overlap: touching endpoints do not collide, so back-to-back
    /// bookings are allowed.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// An existing appointment the requested slot collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingSlot {
    pub appointment_id: Uuid,
    pub slot: TimeSlot,
}

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid booking request: {0}")]
    Validation(String),

    #[error("Slot collides with {} existing appointment(s)", conflicts.len())]
    Conflict { conflicts: Vec<ConflictingSlot> },

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Persistence failure: {0}")]
    Database(DatabaseError),
}

// Stale catalog/appointment lookups surface as the typed not-found arm;
// everything else from the store is a persistence failure.
impl From<DatabaseError> for ScheduleError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound { entity_type, id } => Self::NotFound { entity_type, id },
            other => Self::Database(other),
        }
    }
}

impl From<rusqlite::Error> for ScheduleError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(DatabaseError::Sqlite(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(s: (u32, u32), e: (u32, u32)) -> TimeSlot {
        TimeSlot::new(
            NaiveTime::from_hms_opt(s.0, s.1, 0).unwrap(),
            NaiveTime::from_hms_opt(e.0, e.1, 0).unwrap(),
        )
    }

    #[test]
    fn overlap_is_half_open() {
        let morning = slot((9, 0), (9, 30));
        assert!(morning.overlaps(&slot((9, 15), (9, 45))));
        assert!(morning.overlaps(&slot((8, 45), (9, 15))));
        assert!(morning.overlaps(&slot((9, 0), (9, 30))));
        assert!(morning.overlaps(&slot((8, 0), (11, 0))));
        // Touching endpoints are fine
        assert!(!morning.overlaps(&slot((9, 30), (10, 0))));
        assert!(!morning.overlaps(&slot((8, 30), (9, 0))));
    }

    #[test]
    fn not_found_lookup_maps_to_typed_arm() {
        let err: ScheduleError = DatabaseError::NotFound {
            entity_type: "Service".into(),
            id: "abc".into(),
        }
        .into();
        assert!(matches!(err, ScheduleError::NotFound { .. }));

        let err: ScheduleError =
            DatabaseError::ConstraintViolation("bad uuid".into()).into();
        assert!(matches!(err, ScheduleError::Database(_)));
    }
}
