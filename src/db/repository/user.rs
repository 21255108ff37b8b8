use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{col_enum, col_time, col_uuid, to_db_time};
use crate::db::DatabaseError;
use crate::models::UserProfile;

pub(crate) const USER_COLUMNS: &str = "u.id, u.email, u.aarogya_id, u.role, u.display_name, u.age, \
     u.gender, u.phone_number, u.blood_group, u.specialization, u.is_public, u.is_authorized, \
     u.registration_date";

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: col_uuid(row, 0)?,
        email: row.get(1)?,
        aarogya_id: row.get(2)?,
        role: col_enum(row, 3)?,
        display_name: row.get(4)?,
        age: row.get(5)?,
        gender: row.get(6)?,
        phone_number: row.get(7)?,
        blood_group: row.get(8)?,
        specialization: row.get(9)?,
        is_public: row.get(10)?,
        is_authorized: row.get(11)?,
        registration_date: col_time(row, 12)?,
    })
}

pub fn insert_user(conn: &Connection, user: &UserProfile) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, email, aarogya_id, role, display_name, age, gender,
                            phone_number, blood_group, specialization, is_public,
                            is_authorized, registration_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            user.id.to_string(),
            user.email,
            user.aarogya_id,
            user.role.as_str(),
            user.display_name,
            user.age,
            user.gender,
            user.phone_number,
            user.blood_group,
            user.specialization,
            user.is_public,
            user.is_authorized,
            to_db_time(&user.registration_date),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(())
}

pub fn get_user_by_email(
    conn: &Connection,
    email: &str,
) -> Result<Option<UserProfile>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?1");
    Ok(conn.query_row(&sql, params![email], map_user).optional()?)
}

pub fn get_user_by_aarogya_id(
    conn: &Connection,
    aarogya_id: &str,
) -> Result<Option<UserProfile>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.aarogya_id = ?1");
    Ok(conn.query_row(&sql, params![aarogya_id], map_user).optional()?)
}

/// Doctors that are both authorized and listed publicly.
pub fn list_public_doctors(conn: &Connection) -> Result<Vec<UserProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u
         WHERE u.role = 'doctor' AND u.is_public = 1 AND u.is_authorized = 1
         ORDER BY u.display_name, u.email"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_user)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Doctors still waiting for platform approval, oldest registration first.
pub fn list_unauthorized_doctors(conn: &Connection) -> Result<Vec<UserProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users u
         WHERE u.role = 'doctor' AND u.is_authorized = 0
         ORDER BY u.registration_date, u.email"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_user)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Mark a doctor account as approved. Returns `false` when `email` does
/// not belong to a doctor.
pub fn authorize_doctor(conn: &Connection, email: &str) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET is_authorized = 1 WHERE email = ?1 AND role = 'doctor'",
        params![email],
    )?;
    Ok(changed > 0)
}

pub fn set_doctor_public(
    conn: &Connection,
    email: &str,
    is_public: bool,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE users SET is_public = ?2 WHERE email = ?1 AND role = 'doctor'",
        params![email, is_public],
    )?;
    Ok(changed > 0)
}
