use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Doctor, Specialty};

pub fn insert_specialty(conn: &Connection, sp: &Specialty) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO specialties (id, name) VALUES (?1, ?2)",
        params![sp.id.to_string(), sp.name],
    )?;
    Ok(())
}

pub fn list_specialties(conn: &Connection) -> Result<Vec<Specialty>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id, name FROM specialties ORDER BY name")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut specialties = Vec::new();
    for row in rows {
        let (id, name) = row?;
        specialties.push(Specialty {
            id: parse_uuid(&id)?,
            name,
        });
    }
    Ok(specialties)
}

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, surname, name, patronymic, specialty_id, experience_years, cabinet)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doctor.id.to_string(),
            doctor.surname,
            doctor.name,
            doctor.patronymic,
            doctor.specialty_id.map(|id| id.to_string()),
            doctor.experience_years,
            doctor.cabinet,
        ],
    )?;
    Ok(())
}

pub fn update_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE doctors SET surname = ?2, name = ?3, patronymic = ?4, specialty_id = ?5,
         experience_years = ?6, cabinet = ?7 WHERE id = ?1",
        params![
            doctor.id.to_string(),
            doctor.surname,
            doctor.name,
            doctor.patronymic,
            doctor.specialty_id.map(|id| id.to_string()),
            doctor.experience_years,
            doctor.cabinet,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: doctor.id.to_string(),
        });
    }
    Ok(())
}

/// Fails with a FK violation while the doctor still has appointments
/// or service offerings.
pub fn delete_doctor(conn: &Connection, doctor_id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM doctors WHERE id = ?1",
        params![doctor_id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: doctor_id.to_string(),
        });
    }
    Ok(())
}

pub fn get_doctor(conn: &Connection, doctor_id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, surname, name, patronymic, specialty_id, experience_years, cabinet
             FROM doctors WHERE id = ?1",
            params![doctor_id.to_string()],
            doctor_row,
        )
        .optional()?;

    row.map(doctor_from_row).transpose()
}

pub fn list_doctors(conn: &Connection) -> Result<Vec<Doctor>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, surname, name, patronymic, specialty_id, experience_years, cabinet
         FROM doctors ORDER BY surname, name",
    )?;
    let rows = stmt.query_map([], doctor_row)?;

    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(doctor_from_row(row?)?);
    }
    Ok(doctors)
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}

type DoctorRow = (String, String, String, Option<String>, Option<String>, i32, i32);

fn doctor_row(row: &rusqlite::Row<'_>) -> Result<DoctorRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn doctor_from_row(row: DoctorRow) -> Result<Doctor, DatabaseError> {
    let (id, surname, name, patronymic, specialty_id, experience_years, cabinet) = row;
    Ok(Doctor {
        id: parse_uuid(&id)?,
        surname,
        name,
        patronymic,
        specialty_id: specialty_id.and_then(|s| Uuid::parse_str(&s).ok()),
        experience_years,
        cabinet,
    })
}
