//! Conflict checker — does a slot overlap an existing appointment for a
//! (doctor, date) partition?
//!
//! Usable standalone for UI pre-validation; the ledger re-runs it inside the
//! write transaction, which is the check that actually counts.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{ConflictingSlot, TimeSlot};
use crate::db::repository::{fmt_time, parse_time, parse_uuid};
use crate::db::DatabaseError;

/// All appointments for the doctor and date whose `[start, end)` interval
/// overlaps `slot`, ordered by start time.
///
/// `exclude` skips the appointment being rescheduled so it never conflicts
/// with its own prior interval. A failed read propagates as an error — it is
/// never a green light to book.
pub fn find_conflicts(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    slot: TimeSlot,
    exclude: Option<&Uuid>,
) -> Result<Vec<ConflictingSlot>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, time_start, time_end FROM appointments
         WHERE doctor_id = ?1 AND date = ?2
           AND time_start < ?3 AND time_end > ?4
           AND (?5 IS NULL OR id != ?5)
         ORDER BY time_start",
    )?;
    let rows = stmt.query_map(
        params![
            doctor_id.to_string(),
            date.to_string(),
            fmt_time(slot.end),
            fmt_time(slot.start),
            exclude.map(|id| id.to_string()),
        ],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    )?;

    let mut conflicts = Vec::new();
    for row in rows {
        let (id, time_start, time_end) = row?;
        conflicts.push(ConflictingSlot {
            appointment_id: parse_uuid(&id)?,
            slot: TimeSlot::new(parse_time(&time_start)?, parse_time(&time_end)?),
        });
    }
    Ok(conflicts)
}

/// Boolean form of [`find_conflicts`] for callers that only pre-validate.
pub fn has_conflict(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
    slot: TimeSlot,
    exclude: Option<&Uuid>,
) -> Result<bool, DatabaseError> {
    Ok(!find_conflicts(conn, doctor_id, date, slot, exclude)?.is_empty())
}
