//! Doctor account lifecycle: platform approval and directory visibility.
//!
//! New doctor accounts start unapproved. The platform owner approves them
//! through the admin surface; an approved doctor then chooses whether to
//! appear in the public directory.

use rusqlite::Connection;

use crate::db;
use crate::error::{require_authorized_doctor, PortalError};
use crate::models::{Caller, DoctorInfo};

/// Doctors awaiting approval.
pub fn unauthorized_doctors(conn: &Connection) -> Result<Vec<DoctorInfo>, PortalError> {
    let doctors = db::list_unauthorized_doctors(conn)?;
    Ok(doctors.iter().map(DoctorInfo::from).collect())
}

/// Approve the doctor account registered under `email`.
pub fn authorize_doctor(conn: &Connection, email: &str) -> Result<DoctorInfo, PortalError> {
    let email = email.trim();
    if !db::authorize_doctor(conn, email)? {
        return Err(not_a_doctor());
    }
    let doctor = db::get_user_by_email(conn, email)?.ok_or_else(not_a_doctor)?;
    tracing::info!(doctor = %email, "Doctor authorized");
    Ok(DoctorInfo::from(&doctor))
}

fn not_a_doctor() -> PortalError {
    PortalError::NotFound(
        "Doctor not found or email is not associated with a doctor account.".into(),
    )
}

/// List or unlist the calling doctor in the public directory.
pub fn set_public_status(
    conn: &Connection,
    caller: &Caller,
    is_public: bool,
) -> Result<(), PortalError> {
    require_authorized_doctor(caller, "Only doctors can change their directory listing.")?;
    if !db::set_doctor_public(conn, &caller.email, is_public)? {
        return Err(PortalError::NotFound("Doctor not found.".into()));
    }
    tracing::info!(doctor = %caller.email, is_public, "Directory listing changed");
    Ok(())
}
