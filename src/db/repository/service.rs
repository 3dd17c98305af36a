use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::doctor::parse_uuid;
use crate::db::DatabaseError;
use crate::models::Service;

pub fn insert_service(conn: &Connection, service: &Service) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO services (id, name, price, duration_minutes) VALUES (?1, ?2, ?3, ?4)",
        params![
            service.id.to_string(),
            service.name,
            service.price,
            service.duration_minutes,
        ],
    )?;
    Ok(())
}

/// Updates the catalog entry only. Past appointments keep the price that was
/// snapshotted into their link rows when they were written.
pub fn update_service(conn: &Connection, service: &Service) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE services SET name = ?2, price = ?3, duration_minutes = ?4 WHERE id = ?1",
        params![
            service.id.to_string(),
            service.name,
            service.price,
            service.duration_minutes,
        ],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Service".into(),
            id: service.id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_service(conn: &Connection, service_id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM service_doctors WHERE service_id = ?1",
        params![service_id.to_string()],
    )?;
    let deleted = conn.execute(
        "DELETE FROM services WHERE id = ?1",
        params![service_id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Service".into(),
            id: service_id.to_string(),
        });
    }
    Ok(())
}

pub fn get_service(conn: &Connection, service_id: &Uuid) -> Result<Option<Service>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, price, duration_minutes FROM services WHERE id = ?1",
            params![service_id.to_string()],
            service_row,
        )
        .optional()?;

    row.map(service_from_row).transpose()
}

pub fn list_services(conn: &Connection) -> Result<Vec<Service>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT id, name, price, duration_minutes FROM services ORDER BY name")?;
    let rows = stmt.query_map([], service_row)?;

    let mut services = Vec::new();
    for row in rows {
        services.push(service_from_row(row?)?);
    }
    Ok(services)
}

/// Replace the set of doctors offering a service.
///
/// The relation is configuration data: a single row expresses the old
/// one-doctor-per-service shape, several rows the shared-price-list shape.
pub fn set_service_doctors(
    conn: &Connection,
    service_id: &Uuid,
    doctor_ids: &[Uuid],
) -> Result<(), DatabaseError> {
    conn.execute(
        "DELETE FROM service_doctors WHERE service_id = ?1",
        params![service_id.to_string()],
    )?;
    for doctor_id in doctor_ids {
        conn.execute(
            "INSERT INTO service_doctors (service_id, doctor_id) VALUES (?1, ?2)",
            params![service_id.to_string(), doctor_id.to_string()],
        )?;
    }
    Ok(())
}

pub fn get_service_doctors(
    conn: &Connection,
    service_id: &Uuid,
) -> Result<Vec<Uuid>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT doctor_id FROM service_doctors WHERE service_id = ?1 ORDER BY doctor_id",
    )?;
    let rows = stmt.query_map(params![service_id.to_string()], |row| {
        row.get::<_, String>(0)
    })?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(parse_uuid(&row?)?);
    }
    Ok(ids)
}

pub fn get_doctor_services(
    conn: &Connection,
    doctor_id: &Uuid,
) -> Result<Vec<Service>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, s.price, s.duration_minutes
         FROM services s
         JOIN service_doctors sd ON sd.service_id = s.id
         WHERE sd.doctor_id = ?1
         ORDER BY s.name",
    )?;
    let rows = stmt.query_map(params![doctor_id.to_string()], service_row)?;

    let mut services = Vec::new();
    for row in rows {
        services.push(service_from_row(row?)?);
    }
    Ok(services)
}

type ServiceRow = (String, String, i64, i64);

fn service_row(row: &rusqlite::Row<'_>) -> Result<ServiceRow, rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn service_from_row(row: ServiceRow) -> Result<Service, DatabaseError> {
    let (id, name, price, duration_minutes) = row;
    Ok(Service {
        id: parse_uuid(&id)?,
        name,
        price,
        duration_minutes,
    })
}
