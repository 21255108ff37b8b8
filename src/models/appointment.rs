use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AppointmentStatus, Severity};
use crate::workflow::AppointmentState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_email: String,
    pub doctor_email: String,
    pub reason: String,
    pub patient_notes: Option<String>,
    pub predicted_severity: Severity,
    pub status: AppointmentStatus,
    pub appointment_time: Option<DateTime<Utc>>,
    pub meeting_link: Option<String>,
    pub is_link_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The workflow-relevant slice of this appointment.
    pub fn state(&self) -> AppointmentState {
        AppointmentState {
            status: self.status,
            is_link_active: self.is_link_active,
        }
    }

    /// Overwrite status and link flag from a workflow state.
    pub fn set_state(&mut self, state: AppointmentState) {
        self.status = state.status;
        self.is_link_active = state.is_link_active;
    }
}

/// Body of `POST /api/appointments/request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRequestBody {
    pub doctor_aarogya_id: String,
    pub reason: String,
    #[serde(default)]
    pub patient_notes: Option<String>,
}

/// Body of `POST /api/appointments/:id/confirm`.
///
/// The time is kept as the raw string the doctor typed so the server
/// can report malformed input as a validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmBody {
    pub appointment_time: String,
}
