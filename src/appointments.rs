//! Patient→doctor appointment requests and their lifecycle.
//!
//! Patients create requests; the addressed doctor confirms (choosing a
//! time, which provisions a meeting link) or rejects them, activates the
//! link when ready and completes the consultation afterwards. Every
//! status change is checked with [`workflow::apply`] and persisted with a
//! compare-and-swap on the previous state.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::error::{parse_id, require_authorized_doctor, require_patient, PortalError};
use crate::meeting::MeetingLinkProvider;
use crate::models::{
    is_valid_aarogya_id, Appointment, AppointmentAction, AppointmentRequestBody, AppointmentStatus,
    Caller, Role,
};
use crate::triage::SeverityPredictor;
use crate::workflow;

const DUPLICATE_PENDING: &str = "You already have a pending appointment request with this doctor.";
const PENDING_NOT_FOUND: &str = "Pending appointment request not found or already processed.";

/// Forms a doctor may type, besides full RFC 3339.
const LOCAL_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

pub fn request_appointment(
    conn: &Connection,
    caller: &Caller,
    triage: &dyn SeverityPredictor,
    body: &AppointmentRequestBody,
    now: &DateTime<Utc>,
) -> Result<Appointment, PortalError> {
    require_patient(caller, "Only patients can request appointments.")?;

    let reason = body.reason.trim();
    if reason.is_empty() {
        return Err(PortalError::Validation("A reason for the appointment is required.".into()));
    }
    let doctor_id = body.doctor_aarogya_id.trim();
    if !is_valid_aarogya_id(doctor_id) {
        return Err(PortalError::InvalidId(doctor_id.to_string()));
    }

    let doctor = db::get_user_by_aarogya_id(conn, doctor_id)?
        .filter(|u| u.role == Role::Doctor)
        .ok_or_else(|| {
            PortalError::NotFound(format!("Doctor not found with AarogyaID: {doctor_id}"))
        })?;
    if !doctor.is_authorized {
        return Err(PortalError::Forbidden(
            "The selected doctor is not yet authorized by the platform owner.".into(),
        ));
    }
    if db::has_pending_appointment(conn, &caller.email, &doctor.email)? {
        tracing::warn!(
            patient = %caller.email,
            doctor = %doctor.email,
            "Duplicate appointment request refused"
        );
        return Err(PortalError::Conflict(DUPLICATE_PENDING.into()));
    }

    let notes = body
        .patient_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());
    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_email: caller.email.clone(),
        doctor_email: doctor.email,
        reason: reason.to_string(),
        patient_notes: notes.map(String::from),
        predicted_severity: triage.predict(reason, notes),
        status: AppointmentStatus::Pending,
        appointment_time: None,
        meeting_link: None,
        is_link_active: false,
        created_at: *now,
        updated_at: *now,
    };

    match db::insert_appointment(conn, &appointment) {
        Ok(()) => {}
        Err(DatabaseError::ConstraintViolation(_)) => {
            return Err(PortalError::Conflict(DUPLICATE_PENDING.into()))
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        appointment_id = %appointment.id,
        severity = %appointment.predicted_severity,
        "Appointment requested"
    );
    Ok(appointment)
}

/// Appointments visible to the caller: their own as patient, addressed to
/// them as doctor.
pub fn list_appointments(
    conn: &Connection,
    caller: &Caller,
) -> Result<Vec<Appointment>, PortalError> {
    let list = match caller.role {
        Role::Patient => db::list_appointments_for_patient(conn, &caller.email)?,
        Role::Doctor => db::list_appointments_for_doctor(conn, &caller.email)?,
    };
    Ok(list)
}

/// The doctor's pending requests, oldest first.
pub fn pending_queue(conn: &Connection, caller: &Caller) -> Result<Vec<Appointment>, PortalError> {
    require_authorized_doctor(caller, "Only doctors can view their appointment queue.")?;
    Ok(db::list_pending_for_doctor(conn, &caller.email)?)
}

/// Parse a confirmation time and check it is not in the past, at minute
/// granularity against `now`. Times without an offset are read as UTC.
pub fn parse_appointment_time(
    raw: &str,
    now: &DateTime<Utc>,
) -> Result<DateTime<Utc>, PortalError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PortalError::Validation("Appointment time is required.".into()));
    }

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            LOCAL_TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
        })
        .ok_or_else(|| PortalError::Validation(format!("Invalid appointment time: {raw}")))?;

    if floor_minute(&parsed) < floor_minute(now) {
        return Err(PortalError::Validation(
            "Appointment time must not be in the past.".into(),
        ));
    }
    Ok(parsed)
}

fn floor_minute(dt: &DateTime<Utc>) -> DateTime<Utc> {
    dt.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(*dt)
}

fn load_for_doctor(
    conn: &Connection,
    caller: &Caller,
    id: &Uuid,
    missing: &str,
) -> Result<Appointment, PortalError> {
    db::get_appointment(conn, id)?
        .filter(|a| a.doctor_email == caller.email)
        .ok_or_else(|| PortalError::NotFound(missing.to_string()))
}

/// Pending → confirmed at `raw_time`, provisioning a meeting link. The
/// link starts inactive.
pub fn confirm(
    conn: &Connection,
    caller: &Caller,
    meetings: &dyn MeetingLinkProvider,
    appointment_id: &str,
    raw_time: &str,
    now: &DateTime<Utc>,
) -> Result<Appointment, PortalError> {
    require_authorized_doctor(caller, "Only doctors can confirm appointments.")?;
    let id = parse_id(appointment_id, "appointment_id")?;
    let time = parse_appointment_time(raw_time, now)?;

    let appointment = load_for_doctor(conn, caller, &id, PENDING_NOT_FOUND)?;
    write_confirmation(conn, meetings, appointment, time, now)
}

/// Confirm an appointment read earlier. The write lands only while the
/// row is still pending.
fn write_confirmation(
    conn: &Connection,
    meetings: &dyn MeetingLinkProvider,
    mut appointment: Appointment,
    time: DateTime<Utc>,
    now: &DateTime<Utc>,
) -> Result<Appointment, PortalError> {
    let id = appointment.id;
    let next = workflow::apply(appointment.state(), AppointmentAction::Confirm)?;

    let link = meetings.provision(&id, &time);
    if !db::confirm_appointment(conn, &id, &time, &link, now)? {
        tracing::info!(appointment_id = %id, "Confirmation lost to a concurrent change");
        return Err(PortalError::NotFound(PENDING_NOT_FOUND.into()));
    }

    tracing::info!(appointment_id = %id, time = %time, "Appointment confirmed");
    appointment.set_state(next);
    appointment.appointment_time = Some(time);
    appointment.meeting_link = Some(link);
    appointment.updated_at = *now;
    Ok(appointment)
}

pub fn reject(
    conn: &Connection,
    caller: &Caller,
    appointment_id: &str,
    now: &DateTime<Utc>,
) -> Result<Appointment, PortalError> {
    transition(conn, caller, appointment_id, AppointmentAction::Reject, now)
}

/// Idempotent: activating an active link changes nothing.
pub fn activate_link(
    conn: &Connection,
    caller: &Caller,
    appointment_id: &str,
    now: &DateTime<Utc>,
) -> Result<Appointment, PortalError> {
    transition(conn, caller, appointment_id, AppointmentAction::ActivateLink, now)
}

/// Confirmed → completed, clearing the link flag in the same statement.
/// Completing a completed appointment succeeds without a write.
pub fn complete(
    conn: &Connection,
    caller: &Caller,
    appointment_id: &str,
    now: &DateTime<Utc>,
) -> Result<Appointment, PortalError> {
    transition(conn, caller, appointment_id, AppointmentAction::Complete, now)
}

fn transition(
    conn: &Connection,
    caller: &Caller,
    appointment_id: &str,
    action: AppointmentAction,
    now: &DateTime<Utc>,
) -> Result<Appointment, PortalError> {
    require_authorized_doctor(caller, "Only doctors can update appointments.")?;
    let id = parse_id(appointment_id, "appointment_id")?;
    let missing = match action.required_status() {
        AppointmentStatus::Pending => PENDING_NOT_FOUND,
        _ => "Appointment not found.",
    };

    let appointment = load_for_doctor(conn, caller, &id, missing)?;
    write_transition(conn, appointment, action, now)
}

/// Apply `action` to an appointment read earlier. The write is a
/// compare-and-swap against the state that was read.
fn write_transition(
    conn: &Connection,
    mut appointment: Appointment,
    action: AppointmentAction,
    now: &DateTime<Utc>,
) -> Result<Appointment, PortalError> {
    let id = appointment.id;
    let current = appointment.state();
    let next = match workflow::apply(current, action) {
        Ok(next) => next,
        Err(e) => {
            tracing::warn!(
                appointment_id = %id,
                action = %action,
                from = %current.status,
                "Transition refused"
            );
            return Err(e.into());
        }
    };
    if next == current {
        return Ok(appointment);
    }

    if !db::update_appointment_state(conn, &id, current, next, now)? {
        return Err(lost_race(conn, &id, action)?);
    }

    tracing::info!(
        appointment_id = %id,
        action = %action,
        to = %next.status,
        "Appointment updated"
    );
    appointment.set_state(next);
    appointment.updated_at = *now;
    Ok(appointment)
}

/// Explain a compare-and-swap that matched no row: re-read the row and
/// report why the action no longer applies.
fn lost_race(
    conn: &Connection,
    id: &Uuid,
    action: AppointmentAction,
) -> Result<PortalError, PortalError> {
    let Some(stored) = db::get_appointment(conn, id)? else {
        return Ok(PortalError::NotFound("Appointment not found.".into()));
    };
    tracing::info!(
        appointment_id = %id,
        action = %action,
        "Transition lost to a concurrent change"
    );
    Ok(match workflow::apply(stored.state(), action) {
        Err(e) => e.into(),
        Ok(_) => PortalError::Conflict(
            "Appointment changed concurrently; refresh and try again.".into(),
        ),
    })
}
