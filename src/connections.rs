//! Doctor→patient connection requests.
//!
//! A doctor finds a patient by Aarogya ID and sends a request; the
//! patient accepts or rejects it. An accepted request is what grants the
//! doctor read access to the patient's reports.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::error::{
    parse_id, require_authorized_doctor, require_doctor, require_patient, PortalError,
};
use crate::models::{
    is_valid_aarogya_id, Caller, ConnectionRequest, ConnectionStatus, DoctorInfo, PatientProfile,
    ResolveAction, Role, UserProfile,
};
use crate::workflow;

fn find_patient(conn: &Connection, aarogya_id: &str) -> Result<UserProfile, PortalError> {
    let aarogya_id = aarogya_id.trim();
    if !is_valid_aarogya_id(aarogya_id) {
        return Err(PortalError::InvalidId(aarogya_id.to_string()));
    }
    match db::get_user_by_aarogya_id(conn, aarogya_id)? {
        Some(user) if user.role == Role::Patient => Ok(user),
        _ => Err(PortalError::NotFound(format!(
            "No patient found with AarogyaID: {aarogya_id}"
        ))),
    }
}

/// Look up one patient, with the status of any open request between the
/// calling doctor and that patient.
pub fn search_patient(
    conn: &Connection,
    caller: &Caller,
    aarogya_id: &str,
) -> Result<PatientProfile, PortalError> {
    require_authorized_doctor(caller, "Only doctors can search for patients.")?;
    let patient = find_patient(conn, aarogya_id)?;
    let status = db::find_open_connection(conn, &caller.email, &patient.email)?.map(|r| r.status);
    Ok(PatientProfile::from_user(&patient, status))
}

pub fn send_request(
    conn: &Connection,
    caller: &Caller,
    aarogya_id: &str,
    now: &DateTime<Utc>,
) -> Result<ConnectionRequest, PortalError> {
    require_authorized_doctor(caller, "Only doctors can send connection requests.")?;
    let patient = find_patient(conn, aarogya_id)?;

    if let Some(existing) = db::find_open_connection(conn, &caller.email, &patient.email)? {
        tracing::warn!(
            doctor = %caller.email,
            status = %existing.status,
            "Duplicate connection request refused"
        );
        return Err(PortalError::Conflict(duplicate_detail(existing.status).into()));
    }

    let request = ConnectionRequest {
        id: Uuid::new_v4(),
        doctor_email: caller.email.clone(),
        patient_email: patient.email.clone(),
        status: ConnectionStatus::Pending,
        created_at: *now,
        resolved_at: None,
    };
    match db::insert_connection_request(conn, &request) {
        Ok(()) => {}
        // Lost a race with a concurrent send for the same pair
        Err(DatabaseError::ConstraintViolation(_)) => {
            return Err(PortalError::Conflict(
                duplicate_detail(ConnectionStatus::Pending).into(),
            ))
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(request_id = %request.id, doctor = %caller.email, "Connection request sent");
    Ok(request)
}

fn duplicate_detail(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Accepted => "You are already connected with this patient.",
        _ => "A pending connection request already exists.",
    }
}

/// Pending requests addressed to the calling patient, newest first.
pub fn list_pending(
    conn: &Connection,
    caller: &Caller,
) -> Result<Vec<ConnectionRequest>, PortalError> {
    require_patient(caller, "Only patients can view connection requests.")?;
    Ok(db::list_pending_for_patient(conn, &caller.email)?)
}

/// Accept or reject a pending request addressed to the calling patient.
pub fn resolve_request(
    conn: &Connection,
    caller: &Caller,
    request_id: &str,
    action: ResolveAction,
    now: &DateTime<Utc>,
) -> Result<ConnectionRequest, PortalError> {
    require_patient(caller, "Only patients can resolve connection requests.")?;
    let id = parse_id(request_id, "request_id")?;

    let mut request = db::get_connection_request(conn, &id)?
        .filter(|r| r.patient_email == caller.email)
        .ok_or_else(|| PortalError::NotFound("Pending request not found".into()))?;

    let next = workflow::resolve(request.status, action)?;
    if !db::update_connection_status(conn, &id, request.status, next, now)? {
        return Err(PortalError::NotFound("Pending request not found".into()));
    }

    tracing::info!(request_id = %id, action = %action, "Connection request resolved");
    request.status = next;
    request.resolved_at = Some(*now);
    Ok(request)
}

/// Doctors the calling patient has accepted.
pub fn connected_doctors(
    conn: &Connection,
    caller: &Caller,
) -> Result<Vec<DoctorInfo>, PortalError> {
    require_patient(caller, "Only patients can view their connected doctors list.")?;
    let doctors = db::list_connected_doctors(conn, &caller.email)?;
    Ok(doctors.iter().map(DoctorInfo::from).collect())
}

/// Patients connected to the calling doctor.
pub fn my_patients(conn: &Connection, caller: &Caller) -> Result<Vec<PatientProfile>, PortalError> {
    require_doctor(caller, "Only doctors can view their patient list.")?;
    let patients = db::list_connected_patients(conn, &caller.email)?;
    Ok(patients
        .iter()
        .map(|p| PatientProfile::from_user(p, Some(ConnectionStatus::Accepted)))
        .collect())
}

/// Authorized doctors that have opted into the public directory.
pub fn public_doctors(conn: &Connection) -> Result<Vec<DoctorInfo>, PortalError> {
    let doctors = db::list_public_doctors(conn)?;
    Ok(doctors.iter().map(DoctorInfo::from).collect())
}
