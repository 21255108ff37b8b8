use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{col_enum, col_opt_time, col_time, col_uuid, to_db_time};
use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentStatus};
use crate::workflow::AppointmentState;

const APPOINTMENT_COLUMNS: &str = "id, patient_email, doctor_email, reason, patient_notes, \
     predicted_severity, status, appointment_time, meeting_link, is_link_active, created_at, \
     updated_at";

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: col_uuid(row, 0)?,
        patient_email: row.get(1)?,
        doctor_email: row.get(2)?,
        reason: row.get(3)?,
        patient_notes: row.get(4)?,
        predicted_severity: col_enum(row, 5)?,
        status: col_enum(row, 6)?,
        appointment_time: col_opt_time(row, 7)?,
        meeting_link: row.get(8)?,
        is_link_active: row.get(9)?,
        created_at: col_time(row, 10)?,
        updated_at: col_time(row, 11)?,
    })
}

fn query_appointments(
    conn: &Connection,
    sql: &str,
    email: &str,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![email], map_appointment)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_email, doctor_email, reason, patient_notes,
                                   predicted_severity, status, appointment_time, meeting_link,
                                   is_link_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            appt.id.to_string(),
            appt.patient_email,
            appt.doctor_email,
            appt.reason,
            appt.patient_notes,
            appt.predicted_severity.as_str(),
            appt.status.as_str(),
            appt.appointment_time.as_ref().map(to_db_time),
            appt.meeting_link,
            appt.is_link_active,
            to_db_time(&appt.created_at),
            to_db_time(&appt.updated_at),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id.to_string()], map_appointment)
        .optional()?)
}

/// Whether the patient already has a pending request with this doctor.
pub fn has_pending_appointment(
    conn: &Connection,
    patient_email: &str,
    doctor_email: &str,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments
         WHERE patient_email = ?1 AND doctor_email = ?2 AND status = 'pending'",
        params![patient_email, doctor_email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Every appointment the patient is part of, newest first.
pub fn list_appointments_for_patient(
    conn: &Connection,
    patient_email: &str,
) -> Result<Vec<Appointment>, DatabaseError> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE patient_email = ?1 ORDER BY created_at DESC"
    );
    query_appointments(conn, &sql, patient_email)
}

/// Every appointment addressed to the doctor, newest first.
pub fn list_appointments_for_doctor(
    conn: &Connection,
    doctor_email: &str,
) -> Result<Vec<Appointment>, DatabaseError> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE doctor_email = ?1 ORDER BY created_at DESC"
    );
    query_appointments(conn, &sql, doctor_email)
}

/// The doctor's pending queue, oldest first.
pub fn list_pending_for_doctor(
    conn: &Connection,
    doctor_email: &str,
) -> Result<Vec<Appointment>, DatabaseError> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE doctor_email = ?1 AND status = 'pending' ORDER BY created_at ASC"
    );
    query_appointments(conn, &sql, doctor_email)
}

/// Pending → confirmed, recording the chosen time and the provisioned link.
/// Returns `false` when the row is no longer pending.
pub fn confirm_appointment(
    conn: &Connection,
    id: &Uuid,
    appointment_time: &DateTime<Utc>,
    meeting_link: &str,
    now: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE appointments
             SET status = ?1, appointment_time = ?2, meeting_link = ?3,
                 is_link_active = 0, updated_at = ?4
             WHERE id = ?5 AND status = ?6",
            params![
                AppointmentStatus::Confirmed.as_str(),
                to_db_time(appointment_time),
                meeting_link,
                to_db_time(now),
                id.to_string(),
                AppointmentStatus::Pending.as_str(),
            ],
        )
        .map_err(DatabaseError::from_write)?;
    Ok(changed == 1)
}

/// Compare-and-swap on status and link flag together. Returns `false`
/// when the stored row no longer matches `expected`.
pub fn update_appointment_state(
    conn: &Connection,
    id: &Uuid,
    expected: AppointmentState,
    next: AppointmentState,
    now: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE appointments SET status = ?1, is_link_active = ?2, updated_at = ?3
             WHERE id = ?4 AND status = ?5 AND is_link_active = ?6",
            params![
                next.status.as_str(),
                next.is_link_active,
                to_db_time(now),
                id.to_string(),
                expected.status.as_str(),
                expected.is_link_active,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    Ok(changed == 1)
}
