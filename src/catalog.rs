//! Catalog store — read-only lookups over doctors, patients and services.
//!
//! Everything here reads committed catalog state; the ledger is the only
//! writer of appointment data and the management tabs are the only writers
//! of catalog data.

use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::{Doctor, Service};

/// Resolve a set of service IDs to full records, preserving input order.
///
/// Any unknown ID fails the whole resolution; the ledger turns that into a
/// typed not-found error instead of silently booking a shorter service list.
pub fn resolve_services(conn: &Connection, ids: &[Uuid]) -> Result<Vec<Service>, DatabaseError> {
    let mut services = Vec::with_capacity(ids.len());
    for id in ids {
        match db::get_service(conn, id)? {
            Some(service) => services.push(service),
            None => {
                return Err(DatabaseError::NotFound {
                    entity_type: "Service".into(),
                    id: id.to_string(),
                })
            }
        }
    }
    Ok(services)
}

/// Look up a doctor, failing if the ID is stale.
pub fn require_doctor(conn: &Connection, doctor_id: &Uuid) -> Result<Doctor, DatabaseError> {
    db::get_doctor(conn, doctor_id)?.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Doctor".into(),
        id: doctor_id.to_string(),
    })
}

/// Whether a doctor currently offers a service.
///
/// A service with no applicability rows is treated as offered clinic-wide;
/// the relation is configuration, not an invariant the ledger enforces.
pub fn service_offered_by(
    conn: &Connection,
    service_id: &Uuid,
    doctor_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let offering = db::get_service_doctors(conn, service_id)?;
    Ok(offering.is_empty() || offering.contains(doctor_id))
}
