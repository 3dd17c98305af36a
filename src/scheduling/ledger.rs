//! Appointment ledger — the only writer of appointment and link rows.
//!
//! Each operation validates, begins an IMMEDIATE transaction (taking SQLite's
//! write lock up front), re-runs the conflict check under that lock, applies
//! the whole write, and commits. The original tool checked for conflicts and
//! then inserted in separate steps, so two concurrent bookings could both
//! pass the check; holding the write lock across check-and-write closes that
//! window. `PRAGMA busy_timeout` bounds how long a caller blocks on a
//! competing writer; an expired wait rolls back and surfaces as a database
//! error.

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conflict::find_conflicts;
use super::{ScheduleError, TimeSlot};
use crate::catalog;
use crate::config::BookingWindow;
use crate::db::{self, DatabaseError};
use crate::models::{Appointment, AppointmentService, Service};

/// Everything a booking or reschedule needs. Plain data; no UI types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub doctor_id: Uuid,
    pub patient_snils: String,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    pub service_ids: Vec<Uuid>,
}

fn validate(window: &BookingWindow, req: &BookingRequest) -> Result<(), ScheduleError> {
    if req.service_ids.is_empty() {
        return Err(ScheduleError::Validation(
            "an appointment needs at least one service".into(),
        ));
    }
    if req.slot.start >= req.slot.end {
        return Err(ScheduleError::Validation(format!(
            "start {} is not before end {}",
            req.slot.start, req.slot.end
        )));
    }
    if !window.contains(req.slot.start, req.slot.end) {
        return Err(ScheduleError::Validation(format!(
            "slot {}-{} falls outside the booking window {}-{}",
            req.slot.start, req.slot.end, window.opens, window.closes
        )));
    }
    Ok(())
}

/// Resolve the request against the catalog under the write lock: services
/// (in request order, with current prices) and the patient's existence.
fn resolve(tx: &Connection, req: &BookingRequest) -> Result<Vec<Service>, ScheduleError> {
    db::get_patient(tx, &req.patient_snils)?.ok_or_else(|| ScheduleError::NotFound {
        entity_type: "Patient".into(),
        id: req.patient_snils.clone(),
    })?;
    Ok(catalog::resolve_services(tx, &req.service_ids)?)
}

fn insert_links(
    tx: &Connection,
    appointment_id: Uuid,
    services: &[Service],
) -> Result<(), DatabaseError> {
    for service in services {
        db::insert_appointment_service(
            tx,
            &AppointmentService {
                appointment_id,
                service_id: service.id,
                price: service.price,
            },
        )?;
    }
    Ok(())
}

/// Book a new appointment, returning its ID.
///
/// `total_sum` is the sum of the resolved service prices and `cabinet` is the
/// doctor's current cabinet, both snapshotted at this write. On conflict the
/// transaction rolls back and the error names the colliding interval(s).
pub fn book_appointment(
    conn: &mut Connection,
    window: &BookingWindow,
    req: &BookingRequest,
) -> Result<Uuid, ScheduleError> {
    validate(window, req)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let conflicts = find_conflicts(&tx, &req.doctor_id, req.date, req.slot, None)?;
    if !conflicts.is_empty() {
        tracing::warn!(
            doctor_id = %req.doctor_id,
            date = %req.date,
            conflicts = conflicts.len(),
            "booking rejected: slot already taken"
        );
        return Err(ScheduleError::Conflict { conflicts });
    }

    let doctor = catalog::require_doctor(&tx, &req.doctor_id)?;
    let services = resolve(&tx, req)?;
    let total_sum: i64 = services.iter().map(|s| s.price).sum();

    let id = Uuid::new_v4();
    db::insert_appointment(
        &tx,
        &Appointment {
            id,
            doctor_id: req.doctor_id,
            patient_snils: req.patient_snils.clone(),
            date: req.date,
            time_start: req.slot.start,
            time_end: req.slot.end,
            cabinet: doctor.cabinet,
            total_sum,
        },
    )?;
    insert_links(&tx, id, &services)?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %id,
        doctor_id = %req.doctor_id,
        date = %req.date,
        total_sum,
        "appointment booked"
    );
    Ok(id)
}

/// Replace an existing appointment's fields and service set in one atomic
/// unit. The conflict check excludes the appointment itself, so keeping the
/// same slot always succeeds.
pub fn reschedule_appointment(
    conn: &mut Connection,
    window: &BookingWindow,
    appointment_id: &Uuid,
    req: &BookingRequest,
) -> Result<(), ScheduleError> {
    validate(window, req)?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if db::get_appointment(&tx, appointment_id)?.is_none() {
        return Err(ScheduleError::NotFound {
            entity_type: "Appointment".into(),
            id: appointment_id.to_string(),
        });
    }

    let conflicts = find_conflicts(&tx, &req.doctor_id, req.date, req.slot, Some(appointment_id))?;
    if !conflicts.is_empty() {
        tracing::warn!(
            appointment_id = %appointment_id,
            doctor_id = %req.doctor_id,
            date = %req.date,
            conflicts = conflicts.len(),
            "reschedule rejected: slot already taken"
        );
        return Err(ScheduleError::Conflict { conflicts });
    }

    let doctor = catalog::require_doctor(&tx, &req.doctor_id)?;
    let services = resolve(&tx, req)?;
    let total_sum: i64 = services.iter().map(|s| s.price).sum();

    db::update_appointment(
        &tx,
        &Appointment {
            id: *appointment_id,
            doctor_id: req.doctor_id,
            patient_snils: req.patient_snils.clone(),
            date: req.date,
            time_start: req.slot.start,
            time_end: req.slot.end,
            cabinet: doctor.cabinet,
            total_sum,
        },
    )?;
    db::delete_appointment_services(&tx, appointment_id)?;
    insert_links(&tx, *appointment_id, &services)?;
    tx.commit()?;

    tracing::info!(appointment_id = %appointment_id, total_sum, "appointment rescheduled");
    Ok(())
}

/// Remove an appointment and all its links atomically.
///
/// Cancelling an already-cancelled ID is a no-op success; the original
/// treated it as a "no selected record" failure.
pub fn cancel_appointment(conn: &mut Connection, appointment_id: &Uuid) -> Result<(), ScheduleError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    db::delete_appointment_services(&tx, appointment_id)?;
    let removed = db::delete_appointment(&tx, appointment_id)?;
    tx.commit()?;

    if removed {
        tracing::info!(appointment_id = %appointment_id, "appointment cancelled");
    } else {
        tracing::debug!(appointment_id = %appointment_id, "cancel of unknown appointment ignored");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::{open_database, open_memory_database};
    use crate::db::{
        get_appointment, get_appointment_services, insert_doctor, insert_patient, insert_service,
        update_service,
    };
    use crate::models::{Doctor, Gender, Patient};
    use chrono::NaiveTime;
    use std::sync::{Arc, Barrier};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn slot(s: (u32, u32), e: (u32, u32)) -> TimeSlot {
        TimeSlot::new(t(s.0, s.1), t(e.0, e.1))
    }

    struct Fixture {
        doctor_id: Uuid,
        snils: String,
        filling: Uuid,
        cleaning: Uuid,
        date: NaiveDate,
    }

    fn seed(conn: &Connection) -> Fixture {
        let doctor_id = Uuid::new_v4();
        insert_doctor(
            conn,
            &Doctor {
                id: doctor_id,
                surname: "Ivanov".into(),
                name: "Ivan".into(),
                patronymic: Some("Petrovich".into()),
                specialty_id: None,
                experience_years: 15,
                cabinet: 3,
            },
        )
        .unwrap();
        insert_patient(
            conn,
            &Patient {
                snils: "12345678901".into(),
                surname: "Petrova".into(),
                name: "Anna".into(),
                patronymic: None,
                birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
                phone: "+7 (900) 111-22-33".into(),
                gender: Gender::Female,
            },
        )
        .unwrap();

        let filling = Uuid::new_v4();
        insert_service(
            conn,
            &Service {
                id: filling,
                name: "Filling".into(),
                price: 500,
                duration_minutes: 45,
            },
        )
        .unwrap();
        let cleaning = Uuid::new_v4();
        insert_service(
            conn,
            &Service {
                id: cleaning,
                name: "Cleaning".into(),
                price: 300,
                duration_minutes: 30,
            },
        )
        .unwrap();

        Fixture {
            doctor_id,
            snils: "12345678901".into(),
            filling,
            cleaning,
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        }
    }

    fn request(fx: &Fixture, slot: TimeSlot, service_ids: Vec<Uuid>) -> BookingRequest {
        BookingRequest {
            doctor_id: fx.doctor_id,
            patient_snils: fx.snils.clone(),
            date: fx.date,
            slot,
            service_ids,
        }
    }

    #[test]
    fn booking_snapshots_total_and_cabinet() {
        let mut conn = open_memory_database().unwrap();
        let window = BookingWindow::default();
        let fx = seed(&conn);

        let id = book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((10, 0), (10, 45)), vec![fx.filling, fx.cleaning]),
        )
        .unwrap();

        let appt = get_appointment(&conn, &id).unwrap().unwrap();
        assert_eq!(appt.total_sum, 800);
        assert_eq!(appt.cabinet, 3);
        assert_eq!(get_appointment_services(&conn, &id).unwrap().len(), 2);

        // A later price change does not reach back into the stored total
        update_service(
            &conn,
            &Service {
                id: fx.cleaning,
                name: "Cleaning".into(),
                price: 400,
                duration_minutes: 30,
            },
        )
        .unwrap();
        let appt = get_appointment(&conn, &id).unwrap().unwrap();
        assert_eq!(appt.total_sum, 800);
    }

    #[test]
    fn empty_service_set_is_rejected_without_rows() {
        let mut conn = open_memory_database().unwrap();
        let window = BookingWindow::default();
        let fx = seed(&conn);

        let result = book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((10, 0), (10, 30)), vec![]),
        );
        assert!(matches!(result, Err(ScheduleError::Validation(_))));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM appointments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn inverted_and_out_of_window_slots_are_rejected() {
        let mut conn = open_memory_database().unwrap();
        let window = BookingWindow::default();
        let fx = seed(&conn);

        for bad in [slot((11, 0), (10, 0)), slot((10, 0), (10, 0)), slot((7, 0), (8, 30)), slot((19, 30), (20, 30))] {
            let result =
                book_appointment(&mut conn, &window, &request(&fx, bad, vec![fx.filling]));
            assert!(matches!(result, Err(ScheduleError::Validation(_))), "{bad:?}");
        }
    }

    #[test]
    fn overlap_fails_with_the_colliding_interval() {
        let mut conn = open_memory_database().unwrap();
        let window = BookingWindow::default();
        let fx = seed(&conn);

        book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((10, 0), (11, 0)), vec![fx.filling]),
        )
        .unwrap();

        let result = book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((10, 30), (11, 30)), vec![fx.cleaning]),
        );
        match result {
            Err(ScheduleError::Conflict { conflicts }) => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].slot, slot((10, 0), (11, 0)));
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM appointments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn back_to_back_bookings_both_succeed() {
        let mut conn = open_memory_database().unwrap();
        let window = BookingWindow::default();
        let fx = seed(&conn);

        book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((9, 0), (9, 30)), vec![fx.filling]),
        )
        .unwrap();
        book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((9, 30), (10, 0)), vec![fx.cleaning]),
        )
        .unwrap();
    }

    #[test]
    fn unknown_service_and_patient_are_not_found() {
        let mut conn = open_memory_database().unwrap();
        let window = BookingWindow::default();
        let fx = seed(&conn);

        let result = book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((10, 0), (10, 30)), vec![Uuid::new_v4()]),
        );
        assert!(matches!(result, Err(ScheduleError::NotFound { .. })));

        let mut req = request(&fx, slot((10, 0), (10, 30)), vec![fx.filling]);
        req.patient_snils = "00000000000".into();
        let result = book_appointment(&mut conn, &window, &req);
        assert!(matches!(result, Err(ScheduleError::NotFound { .. })));
    }

    #[test]
    fn reschedule_to_own_slot_succeeds() {
        let mut conn = open_memory_database().unwrap();
        let window = BookingWindow::default();
        let fx = seed(&conn);

        let id = book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((10, 0), (11, 0)), vec![fx.filling]),
        )
        .unwrap();

        reschedule_appointment(
            &mut conn,
            &window,
            &id,
            &request(&fx, slot((10, 0), (11, 0)), vec![fx.filling]),
        )
        .unwrap();
    }

    #[test]
    fn reschedule_replaces_services_and_total() {
        let mut conn = open_memory_database().unwrap();
        let window = BookingWindow::default();
        let fx = seed(&conn);

        let id = book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((10, 0), (11, 0)), vec![fx.filling, fx.cleaning]),
        )
        .unwrap();

        reschedule_appointment(
            &mut conn,
            &window,
            &id,
            &request(&fx, slot((14, 0), (14, 30)), vec![fx.cleaning]),
        )
        .unwrap();

        let appt = get_appointment(&conn, &id).unwrap().unwrap();
        assert_eq!(appt.time_start, t(14, 0));
        assert_eq!(appt.total_sum, 300);
        let links = get_appointment_services(&conn, &id).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].service_id, fx.cleaning);
    }

    #[test]
    fn reschedule_of_cancelled_appointment_is_not_found() {
        let mut conn = open_memory_database().unwrap();
        let window = BookingWindow::default();
        let fx = seed(&conn);

        let id = book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((10, 0), (11, 0)), vec![fx.filling]),
        )
        .unwrap();
        cancel_appointment(&mut conn, &id).unwrap();

        let result = reschedule_appointment(
            &mut conn,
            &window,
            &id,
            &request(&fx, slot((12, 0), (13, 0)), vec![fx.filling]),
        );
        assert!(matches!(result, Err(ScheduleError::NotFound { .. })));
    }

    #[test]
    fn cancel_removes_links_and_is_idempotent() {
        let mut conn = open_memory_database().unwrap();
        let window = BookingWindow::default();
        let fx = seed(&conn);

        let id = book_appointment(
            &mut conn,
            &window,
            &request(&fx, slot((10, 0), (11, 0)), vec![fx.filling, fx.cleaning]),
        )
        .unwrap();

        cancel_appointment(&mut conn, &id).unwrap();
        assert!(get_appointment(&conn, &id).unwrap().is_none());
        assert!(get_appointment_services(&conn, &id).unwrap().is_empty());

        // No-op success on the second call
        cancel_appointment(&mut conn, &id).unwrap();
    }

    #[test]
    fn concurrent_overlapping_bookings_have_exactly_one_winner() {
        let db_file = tempfile::NamedTempFile::new().unwrap();
        let path = db_file.path().to_path_buf();

        let fx = {
            let conn = open_database(&path).unwrap();
            seed(&conn)
        };

        let barrier = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();
        for service in [fx.filling, fx.cleaning] {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            let req = request(&fx, slot((10, 0), (11, 0)), vec![service]);
            handles.push(std::thread::spawn(move || {
                let mut conn = open_database(&path).unwrap();
                barrier.wait();
                book_appointment(&mut conn, &BookingWindow::default(), &req)
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1, "exactly one overlapping booking may commit");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(ScheduleError::Conflict { .. }))));

        let conn = open_database(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM appointments", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
