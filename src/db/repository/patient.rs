use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::{Gender, Patient};

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (snils, surname, name, patronymic, birth_date, phone, gender)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            patient.snils,
            patient.surname,
            patient.name,
            patient.patronymic,
            patient.birth_date.to_string(),
            patient.phone,
            patient.gender.as_str(),
        ],
    )?;
    Ok(())
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE patients SET surname = ?2, name = ?3, patronymic = ?4, birth_date = ?5,
         phone = ?6, gender = ?7 WHERE snils = ?1",
        params![
            patient.snils,
            patient.surname,
            patient.name,
            patient.patronymic,
            patient.birth_date.to_string(),
            patient.phone,
            patient.gender.as_str(),
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient.snils.clone(),
        });
    }
    Ok(())
}

/// Fails with a FK violation while the patient still has appointments.
pub fn delete_patient(conn: &Connection, snils: &str) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM patients WHERE snils = ?1", params![snils])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: snils.to_string(),
        });
    }
    Ok(())
}

pub fn get_patient(conn: &Connection, snils: &str) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT snils, surname, name, patronymic, birth_date, phone, gender
             FROM patients WHERE snils = ?1",
            params![snils],
            patient_row,
        )
        .optional()?;

    row.map(patient_from_row).transpose()
}

pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT snils, surname, name, patronymic, birth_date, phone, gender
         FROM patients ORDER BY surname, name",
    )?;
    let rows = stmt.query_map([], patient_row)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

type PatientRow = (String, String, String, Option<String>, String, String, String);

fn patient_row(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
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

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    let (snils, surname, name, patronymic, birth_date, phone, gender) = row;
    Ok(Patient {
        snils,
        surname,
        name,
        patronymic,
        birth_date: NaiveDate::parse_from_str(&birth_date, "%Y-%m-%d")
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        phone,
        gender: Gender::from_str(&gender)?,
    })
}
