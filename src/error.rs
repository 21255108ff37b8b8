//! Domain error taxonomy shared by the connection, appointment and report
//! managers.

use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{AppointmentAction, AppointmentStatus, Caller};
use crate::workflow::TransitionError;

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid Aarogya ID: {0}")]
    InvalidId(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(DatabaseError),
}

/// Shown for constraint failures no manager translated itself.
pub const CONSTRAINT_CONFLICT: &str = "The request conflicts with existing data.";

impl From<DatabaseError> for PortalError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConstraintViolation(detail) => {
                tracing::warn!(%detail, "Write refused by a database constraint");
                PortalError::Conflict(CONSTRAINT_CONFLICT.into())
            }
            DatabaseError::NotFound { entity_type, id } => {
                PortalError::NotFound(format!("{entity_type} {id} not found"))
            }
            other => PortalError::Database(other),
        }
    }
}

/// Actions that need a pending request report a processed one as missing;
/// actions that need a confirmed appointment report anything else as a
/// conflict.
impl From<TransitionError> for PortalError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Illegal { action, .. }
                if action.required_status() == AppointmentStatus::Pending =>
            {
                PortalError::NotFound(
                    "Pending appointment request not found or already processed.".into(),
                )
            }
            TransitionError::Illegal { from, action } => PortalError::Conflict(format!(
                "Appointment must be confirmed to {} (currently {from})",
                verb(action)
            )),
            TransitionError::AlreadyResolved { .. } => {
                PortalError::NotFound("Pending request not found".into())
            }
        }
    }
}

// ── Guards shared by the managers ───────────────────────────

pub(crate) fn require_patient(caller: &Caller, detail: &str) -> Result<(), PortalError> {
    if caller.is_patient() {
        Ok(())
    } else {
        Err(PortalError::Forbidden(detail.to_string()))
    }
}

pub(crate) fn require_doctor(caller: &Caller, detail: &str) -> Result<(), PortalError> {
    if caller.is_doctor() {
        Ok(())
    } else {
        Err(PortalError::Forbidden(detail.to_string()))
    }
}

/// Doctors act on patients only after the platform owner approves them.
pub(crate) fn require_authorized_doctor(caller: &Caller, detail: &str) -> Result<(), PortalError> {
    require_doctor(caller, detail)?;
    if caller.is_authorized {
        Ok(())
    } else {
        Err(PortalError::Forbidden(
            "You must be authorized by the platform owner to perform this action.".into(),
        ))
    }
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, PortalError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| PortalError::Validation(format!("Invalid {what} format.")))
}

fn verb(action: AppointmentAction) -> &'static str {
    match action {
        AppointmentAction::Confirm => "confirm it",
        AppointmentAction::Reject => "reject it",
        AppointmentAction::ActivateLink => "activate the meeting link",
        AppointmentAction::Complete => "complete it",
    }
}
