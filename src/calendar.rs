//! Calendar index — per-doctor, per-date read projection.
//!
//! Rebuilt on demand from committed appointment state (doctor selection
//! change or explicit refresh); it holds no write authority and is never a
//! cache with its own lifetime. The UI highlights dates that have entries and
//! shows the day's detail list on click; the day sheet feeds the booking
//! tab's per-date table across all doctors.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository::{parse_date, parse_time, parse_uuid};
use crate::db::DatabaseError;
use crate::scheduling::TimeSlot;

/// One appointment as shown in a doctor's day detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayAppointment {
    pub appointment_id: Uuid,
    pub slot: TimeSlot,
    pub patient_name: String,
    /// Comma-joined service names, e.g. "Cleaning, Filling".
    pub services: String,
}

/// One row of the all-doctors day sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySheetRow {
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub doctor_name: String,
    pub cabinet: i32,
    pub services: String,
    pub slot: TimeSlot,
    pub total_sum: i64,
}

fn display_name(surname: &str, name: &str, patronymic: Option<&str>) -> String {
    match patronymic {
        Some(p) => format!("{surname} {name} {p}"),
        None => format!("{surname} {name}"),
    }
}

/// Build the doctor's full schedule, keyed by date, each day ordered by
/// start time.
pub fn build_schedule_index(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<BTreeMap<NaiveDate, Vec<DayAppointment>>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.date, a.time_start, a.time_end,
                p.surname, p.name,
                GROUP_CONCAT(s.name, ', ') AS services
         FROM appointments a
         JOIN patients p ON a.patient_snils = p.snils
         JOIN appointment_services aps ON aps.appointment_id = a.id
         JOIN services s ON s.id = aps.service_id
         WHERE a.doctor_id = ?1
         GROUP BY a.id, a.date, a.time_start, a.time_end, p.surname, p.name
         ORDER BY a.date, a.time_start",
    )?;
    let rows = stmt.query_map(params![doctor_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut index: BTreeMap<NaiveDate, Vec<DayAppointment>> = BTreeMap::new();
    for row in rows {
        let (id, date, time_start, time_end, surname, name, services) = row?;
        index.entry(parse_date(&date)?).or_default().push(DayAppointment {
            appointment_id: parse_uuid(&id)?,
            slot: TimeSlot::new(parse_time(&time_start)?, parse_time(&time_end)?),
            patient_name: display_name(&surname, &name, None),
            services,
        });
    }
    Ok(index)
}

/// All appointments on one date across every doctor, ordered by start time.
pub fn day_sheet(conn: &Connection, date: NaiveDate) -> Result<Vec<DaySheetRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.time_start, a.time_end, a.cabinet, a.total_sum,
                p.surname, p.name, p.patronymic,
                d.surname, d.name, d.patronymic,
                GROUP_CONCAT(s.name, ', ') AS services
         FROM appointments a
         JOIN patients p ON a.patient_snils = p.snils
         JOIN doctors d ON a.doctor_id = d.id
         JOIN appointment_services aps ON aps.appointment_id = a.id
         JOIN services s ON s.id = aps.service_id
         WHERE a.date = ?1
         GROUP BY a.id, a.time_start, a.time_end, a.cabinet, a.total_sum,
                  p.surname, p.name, p.patronymic, d.surname, d.name, d.patronymic
         ORDER BY a.time_start",
    )?;
    let rows = stmt.query_map(params![date.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i32>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, Option<String>>(7)?,
            row.get::<_, String>(8)?,
            row.get::<_, String>(9)?,
            row.get::<_, Option<String>>(10)?,
            row.get::<_, String>(11)?,
        ))
    })?;

    let mut sheet = Vec::new();
    for row in rows {
        let (
            id,
            time_start,
            time_end,
            cabinet,
            total_sum,
            p_surname,
            p_name,
            p_patronymic,
            d_surname,
            d_name,
            d_patronymic,
            services,
        ) = row?;
        sheet.push(DaySheetRow {
            appointment_id: parse_uuid(&id)?,
            patient_name: display_name(&p_surname, &p_name, p_patronymic.as_deref()),
            doctor_name: display_name(&d_surname, &d_name, d_patronymic.as_deref()),
            cabinet,
            services,
            slot: TimeSlot::new(parse_time(&time_start)?, parse_time(&time_end)?),
            total_sum,
        });
    }
    Ok(sheet)
}
