use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::user::{map_user, USER_COLUMNS};
use super::{col_enum, col_opt_time, col_time, col_uuid, to_db_time};
use crate::db::DatabaseError;
use crate::models::{ConnectionRequest, ConnectionStatus, UserProfile};

const REQUEST_COLUMNS: &str =
    "id, doctor_email, patient_email, status, created_at, resolved_at";

fn map_request(row: &Row<'_>) -> rusqlite::Result<ConnectionRequest> {
    Ok(ConnectionRequest {
        id: col_uuid(row, 0)?,
        doctor_email: row.get(1)?,
        patient_email: row.get(2)?,
        status: col_enum(row, 3)?,
        created_at: col_time(row, 4)?,
        resolved_at: col_opt_time(row, 5)?,
    })
}

pub fn insert_connection_request(
    conn: &Connection,
    request: &ConnectionRequest,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO connection_requests (id, doctor_email, patient_email, status,
                                          created_at, resolved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            request.id.to_string(),
            request.doctor_email,
            request.patient_email,
            request.status.as_str(),
            to_db_time(&request.created_at),
            request.resolved_at.as_ref().map(to_db_time),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(())
}

pub fn get_connection_request(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<ConnectionRequest>, DatabaseError> {
    let sql = format!("SELECT {REQUEST_COLUMNS} FROM connection_requests WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id.to_string()], map_request)
        .optional()?)
}

/// The pending or accepted request between a doctor and a patient, if any.
pub fn find_open_connection(
    conn: &Connection,
    doctor_email: &str,
    patient_email: &str,
) -> Result<Option<ConnectionRequest>, DatabaseError> {
    let sql = format!(
        "SELECT {REQUEST_COLUMNS} FROM connection_requests
         WHERE doctor_email = ?1 AND patient_email = ?2
           AND status IN ('pending', 'accepted')
         ORDER BY created_at DESC LIMIT 1"
    );
    Ok(conn
        .query_row(&sql, params![doctor_email, patient_email], map_request)
        .optional()?)
}

/// Pending requests addressed to a patient, newest first.
pub fn list_pending_for_patient(
    conn: &Connection,
    patient_email: &str,
) -> Result<Vec<ConnectionRequest>, DatabaseError> {
    let sql = format!(
        "SELECT {REQUEST_COLUMNS} FROM connection_requests
         WHERE patient_email = ?1 AND status = 'pending'
         ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_email], map_request)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Compare-and-swap a request's status. Returns `false` when the row no
/// longer has the `expected` status (already resolved elsewhere).
pub fn update_connection_status(
    conn: &Connection,
    id: &Uuid,
    expected: ConnectionStatus,
    new_status: ConnectionStatus,
    resolved_at: &DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE connection_requests SET status = ?1, resolved_at = ?2
             WHERE id = ?3 AND status = ?4",
            params![
                new_status.as_str(),
                to_db_time(resolved_at),
                id.to_string(),
                expected.as_str(),
            ],
        )
        .map_err(DatabaseError::from_write)?;
    Ok(changed == 1)
}

/// Whether an accepted connection exists between the pair.
pub fn is_connected(
    conn: &Connection,
    doctor_email: &str,
    patient_email: &str,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM connection_requests
         WHERE doctor_email = ?1 AND patient_email = ?2 AND status = 'accepted'",
        params![doctor_email, patient_email],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn list_connected_doctors(
    conn: &Connection,
    patient_email: &str,
) -> Result<Vec<UserProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u
         JOIN connection_requests c ON c.doctor_email = u.email
         WHERE c.patient_email = ?1 AND c.status = 'accepted'
         ORDER BY c.resolved_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![patient_email], map_user)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn list_connected_patients(
    conn: &Connection,
    doctor_email: &str,
) -> Result<Vec<UserProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u
         JOIN connection_requests c ON c.patient_email = u.email
         WHERE c.doctor_email = ?1 AND c.status = 'accepted'
         ORDER BY c.resolved_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![doctor_email], map_user)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}
