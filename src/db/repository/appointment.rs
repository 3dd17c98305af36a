use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::doctor::parse_uuid;
use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentService};

/// Times persist as 'HH:MM' so SQLite's lexicographic comparison matches
/// chronological order in the conflict query.
pub(crate) fn fmt_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

pub(crate) fn parse_time(s: &str) -> Result<NaiveTime, DatabaseError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, doctor_id, patient_snils, date, time_start, time_end, cabinet, total_sum)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appt.id.to_string(),
            appt.doctor_id.to_string(),
            appt.patient_snils,
            appt.date.to_string(),
            fmt_time(appt.time_start),
            fmt_time(appt.time_end),
            appt.cabinet,
            appt.total_sum,
        ],
    )?;
    Ok(())
}

pub fn update_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE appointments SET doctor_id = ?2, patient_snils = ?3, date = ?4,
         time_start = ?5, time_end = ?6, cabinet = ?7, total_sum = ?8 WHERE id = ?1",
        params![
            appt.id.to_string(),
            appt.doctor_id.to_string(),
            appt.patient_snils,
            appt.date.to_string(),
            fmt_time(appt.time_start),
            fmt_time(appt.time_end),
            appt.cabinet,
            appt.total_sum,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: appt.id.to_string(),
        });
    }
    Ok(())
}

/// Returns whether a row was actually removed.
pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM appointments WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(deleted > 0)
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, doctor_id, patient_snils, date, time_start, time_end, cabinet, total_sum
             FROM appointments WHERE id = ?1",
            params![id.to_string()],
            appointment_row,
        )
        .optional()?;

    row.map(appointment_from_row).transpose()
}

/// All appointments in a (doctor, date) partition, ordered by start time.
/// This is the read side of the conflict check.
pub fn appointments_for_doctor_date(
    conn: &Connection,
    doctor_id: &Uuid,
    date: NaiveDate,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, doctor_id, patient_snils, date, time_start, time_end, cabinet, total_sum
         FROM appointments WHERE doctor_id = ?1 AND date = ?2
         ORDER BY time_start",
    )?;
    let rows = stmt.query_map(
        params![doctor_id.to_string(), date.to_string()],
        appointment_row,
    )?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row?)?);
    }
    Ok(appointments)
}

pub fn insert_appointment_service(
    conn: &Connection,
    link: &AppointmentService,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointment_services (appointment_id, service_id, price) VALUES (?1, ?2, ?3)",
        params![
            link.appointment_id.to_string(),
            link.service_id.to_string(),
            link.price,
        ],
    )?;
    Ok(())
}

pub fn delete_appointment_services(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM appointment_services WHERE appointment_id = ?1",
        params![appointment_id.to_string()],
    )?;
    Ok(())
}

pub fn get_appointment_services(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Vec<AppointmentService>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT appointment_id, service_id, price FROM appointment_services
         WHERE appointment_id = ?1",
    )?;
    let rows = stmt.query_map(params![appointment_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    let mut links = Vec::new();
    for row in rows {
        let (appointment_id, service_id, price) = row?;
        links.push(AppointmentService {
            appointment_id: parse_uuid(&appointment_id)?,
            service_id: parse_uuid(&service_id)?,
            price,
        });
    }
    Ok(links)
}

type AppointmentRow = (String, String, String, String, String, String, i32, i64);

fn appointment_row(row: &rusqlite::Row<'_>) -> Result<AppointmentRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    let (id, doctor_id, patient_snils, date, time_start, time_end, cabinet, total_sum) = row;
    Ok(Appointment {
        id: parse_uuid(&id)?,
        doctor_id: parse_uuid(&doctor_id)?,
        patient_snils,
        date: parse_date(&date)?,
        time_start: parse_time(&time_start)?,
        time_end: parse_time(&time_end)?,
        cabinet,
        total_sum,
    })
}
