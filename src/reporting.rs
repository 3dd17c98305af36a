//! Reporting aggregator — summary statistics over an inclusive date range.
//!
//! Revenue figures sum the `total_sum` snapshots stored on appointment rows,
//! and per-service price statistics read the prices snapshotted on link rows,
//! so reports over past periods are stable under catalog price edits. An
//! empty range yields zeroed aggregates, not an error.

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// How many most-frequent services the overall report lists.
pub const TOP_SERVICES_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportDimension {
    Overall,
    ByDoctor,
    ByService,
    ByPatient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceUsage {
    pub service_name: String,
    pub count: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallReport {
    pub total_appointments: i64,
    pub distinct_patients: i64,
    pub distinct_doctors: i64,
    pub total_revenue: i64,
    pub top_services: Vec<ServiceUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorReportRow {
    pub doctor_name: String,
    pub specialty: Option<String>,
    pub appointment_count: i64,
    pub distinct_patients: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReportRow {
    pub service_name: String,
    pub occurrence_count: i64,
    pub min_price: i64,
    pub max_price: i64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientReportRow {
    pub patient_name: String,
    pub birth_date: String,
    pub phone: String,
    pub visit_count: i64,
    pub total_spent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Report {
    Overall(OverallReport),
    ByDoctor(Vec<DoctorReportRow>),
    ByService(Vec<ServiceReportRow>),
    ByPatient(Vec<PatientReportRow>),
}

/// Aggregate appointments with `start <= date <= end` along one dimension.
pub fn aggregate(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
    dimension: ReportDimension,
) -> Result<Report, DatabaseError> {
    match dimension {
        ReportDimension::Overall => Ok(Report::Overall(overall(conn, start, end)?)),
        ReportDimension::ByDoctor => Ok(Report::ByDoctor(by_doctor(conn, start, end)?)),
        ReportDimension::ByService => Ok(Report::ByService(by_service(conn, start, end)?)),
        ReportDimension::ByPatient => Ok(Report::ByPatient(by_patient(conn, start, end)?)),
    }
}

fn overall(conn: &Connection, start: NaiveDate, end: NaiveDate) -> Result<OverallReport, DatabaseError> {
    let (total_appointments, distinct_patients, distinct_doctors, total_revenue) = conn.query_row(
        "SELECT COUNT(*),
                COUNT(DISTINCT patient_snils),
                COUNT(DISTINCT doctor_id),
                COALESCE(SUM(total_sum), 0)
         FROM appointments WHERE date BETWEEN ?1 AND ?2",
        params![start.to_string(), end.to_string()],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        },
    )?;

    let mut stmt = conn.prepare(
        "SELECT s.name, COUNT(*) AS cnt, SUM(aps.price)
         FROM appointment_services aps
         JOIN appointments a ON a.id = aps.appointment_id
         JOIN services s ON s.id = aps.service_id
         WHERE a.date BETWEEN ?1 AND ?2
         GROUP BY s.id, s.name
         ORDER BY cnt DESC, s.name
         LIMIT ?3",
    )?;
    let rows = stmt.query_map(
        params![start.to_string(), end.to_string(), TOP_SERVICES_LIMIT as i64],
        |row| {
            Ok(ServiceUsage {
                service_name: row.get(0)?,
                count: row.get(1)?,
                revenue: row.get(2)?,
            })
        },
    )?;
    let top_services = rows.collect::<Result<Vec<_>, _>>()?;

    Ok(OverallReport {
        total_appointments,
        distinct_patients,
        distinct_doctors,
        total_revenue,
        top_services,
    })
}

fn by_doctor(conn: &Connection, start: NaiveDate, end: NaiveDate) -> Result<Vec<DoctorReportRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT d.surname || ' ' || d.name || COALESCE(' ' || d.patronymic, ''),
                sp.name,
                COUNT(a.id),
                COUNT(DISTINCT a.patient_snils),
                COALESCE(SUM(a.total_sum), 0) AS revenue
         FROM doctors d
         JOIN appointments a ON a.doctor_id = d.id
         LEFT JOIN specialties sp ON sp.id = d.specialty_id
         WHERE a.date BETWEEN ?1 AND ?2
         GROUP BY d.id, sp.name
         ORDER BY revenue DESC",
    )?;
    let rows = stmt.query_map(params![start.to_string(), end.to_string()], |row| {
        Ok(DoctorReportRow {
            doctor_name: row.get(0)?,
            specialty: row.get(1)?,
            appointment_count: row.get(2)?,
            distinct_patients: row.get(3)?,
            revenue: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn by_service(conn: &Connection, start: NaiveDate, end: NaiveDate) -> Result<Vec<ServiceReportRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT s.name, COUNT(*) AS cnt, MIN(aps.price), MAX(aps.price), SUM(aps.price)
         FROM services s
         JOIN appointment_services aps ON aps.service_id = s.id
         JOIN appointments a ON a.id = aps.appointment_id
         WHERE a.date BETWEEN ?1 AND ?2
         GROUP BY s.id, s.name
         ORDER BY cnt DESC, s.name",
    )?;
    let rows = stmt.query_map(params![start.to_string(), end.to_string()], |row| {
        Ok(ServiceReportRow {
            service_name: row.get(0)?,
            occurrence_count: row.get(1)?,
            min_price: row.get(2)?,
            max_price: row.get(3)?,
            revenue: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn by_patient(conn: &Connection, start: NaiveDate, end: NaiveDate) -> Result<Vec<PatientReportRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT p.surname || ' ' || p.name || COALESCE(' ' || p.patronymic, ''),
                p.birth_date, p.phone,
                COUNT(a.id),
                COALESCE(SUM(a.total_sum), 0) AS spent
         FROM patients p
         JOIN appointments a ON a.patient_snils = p.snils
         WHERE a.date BETWEEN ?1 AND ?2
         GROUP BY p.snils
         ORDER BY spent DESC",
    )?;
    let rows = stmt.query_map(params![start.to_string(), end.to_string()], |row| {
        Ok(PatientReportRow {
            patient_name: row.get(0)?,
            birth_date: row.get(1)?,
            phone: row.get(2)?,
            visit_count: row.get(3)?,
            total_spent: row.get(4)?,
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Plain-text rendering consumed by external export collaborators.
pub fn render_text(report: &Report, start: NaiveDate, end: NaiveDate) -> String {
    let mut out = String::new();
    match report {
        Report::Overall(r) => {
            out.push_str(&format!("GENERAL REPORT\nPeriod: {start} - {end}\n\n"));
            out.push_str(&format!("Appointments: {}\n", r.total_appointments));
            out.push_str(&format!("Patients: {}\n", r.distinct_patients));
            out.push_str(&format!("Doctors: {}\n", r.distinct_doctors));
            out.push_str(&format!("Total revenue: {}\n", r.total_revenue));
            out.push_str("\nTOP SERVICES:\n");
            for s in &r.top_services {
                out.push_str(&format!("{}: {} times - {}\n", s.service_name, s.count, s.revenue));
            }
        }
        Report::ByDoctor(rows) => {
            out.push_str(&format!("DOCTOR REPORT\nPeriod: {start} - {end}\n"));
            for r in rows {
                out.push_str(&format!(
                    "\nDoctor: {}\nSpecialty: {}\nAppointments: {}\nUnique patients: {}\nRevenue: {}\n",
                    r.doctor_name,
                    r.specialty.as_deref().unwrap_or("-"),
                    r.appointment_count,
                    r.distinct_patients,
                    r.revenue,
                ));
            }
        }
        Report::ByService(rows) => {
            out.push_str(&format!("SERVICE REPORT\nPeriod: {start} - {end}\n"));
            for r in rows {
                out.push_str(&format!(
                    "\nService: {}\nPerformed: {}\nMin price: {}\nMax price: {}\nRevenue: {}\n",
                    r.service_name, r.occurrence_count, r.min_price, r.max_price, r.revenue,
                ));
            }
        }
        Report::ByPatient(rows) => {
            out.push_str(&format!("PATIENT REPORT\nPeriod: {start} - {end}\n"));
            for r in rows {
                out.push_str(&format!(
                    "\nPatient: {}\nBorn: {}\nPhone: {}\nVisits: {}\nTotal spent: {}\n",
                    r.patient_name, r.birth_date, r.phone, r.visit_count, r.total_spent,
                ));
            }
        }
    }
    out
}
