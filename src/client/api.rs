//! The contract a UI-side store uses to reach the portal.
//!
//! [`HttpPortalApi`](super::http::HttpPortalApi) implements it over HTTP;
//! tests substitute in-memory fakes.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentRequestBody, ConfirmResponse, ConnectionRequest, MessageResponse,
    PatientProfile, Report, ReportContent, ResolveAction, SuccessResponse, SummaryResponse,
    UploadMetadata,
};

/// Shown when the server gave no usable `detail`.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InvalidId,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ServiceUnavailable,
    /// No response: connection refused, timeout, TLS.
    Transport,
    /// A response the client could not make sense of.
    Unexpected,
}

impl ErrorKind {
    /// Kind for a non-2xx status, refined by the server's error `code`.
    pub fn from_status(status: u16, code: Option<&str>) -> Self {
        match (status, code) {
            (400, Some("INVALID_ID")) => Self::InvalidId,
            (400, _) | (422, _) => Self::Validation,
            (401, _) => Self::Unauthorized,
            (403, _) => Self::Forbidden,
            (404, _) => Self::NotFound,
            (409, _) => Self::Conflict,
            (503, _) => Self::ServiceUnavailable,
            _ => Self::Unexpected,
        }
    }

    /// The server already moved on; refresh instead of retrying.
    pub fn is_stale_state(&self) -> bool {
        matches!(self, Self::Conflict | Self::NotFound)
    }
}

/// Failure of a single [`PortalApi`] call. `detail` is user-facing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct ClientError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl ClientError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Build from a response status and the server's `detail`, falling
    /// back to [`GENERIC_FAILURE`].
    pub fn from_response(status: u16, code: Option<&str>, detail: Option<String>) -> Self {
        let detail = detail
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        Self::new(ErrorKind::from_status(status, code), detail)
    }
}

/// Every portal operation a client can issue.
#[async_trait]
pub trait PortalApi: Send + Sync {
    // ── Connections ─────────────────────────────────────────
    async fn search_patient(&self, aarogya_id: &str) -> Result<PatientProfile, ClientError>;
    async fn send_connection_request(
        &self,
        aarogya_id: &str,
    ) -> Result<MessageResponse, ClientError>;
    async fn pending_connections(&self) -> Result<Vec<ConnectionRequest>, ClientError>;
    async fn resolve_connection(
        &self,
        request_id: &Uuid,
        action: ResolveAction,
    ) -> Result<MessageResponse, ClientError>;

    // ── Appointments ────────────────────────────────────────
    async fn request_appointment(
        &self,
        body: &AppointmentRequestBody,
    ) -> Result<Appointment, ClientError>;
    async fn appointments(&self) -> Result<Vec<Appointment>, ClientError>;
    async fn confirm_appointment(
        &self,
        appointment_id: &Uuid,
        appointment_time: &str,
    ) -> Result<ConfirmResponse, ClientError>;
    async fn reject_appointment(
        &self,
        appointment_id: &Uuid,
    ) -> Result<MessageResponse, ClientError>;
    async fn activate_link(&self, appointment_id: &Uuid) -> Result<SuccessResponse, ClientError>;
    async fn complete_appointment(
        &self,
        appointment_id: &Uuid,
    ) -> Result<SuccessResponse, ClientError>;

    // ── Reports ─────────────────────────────────────────────
    async fn upload_report(
        &self,
        meta: &UploadMetadata,
        bytes: Vec<u8>,
    ) -> Result<Report, ClientError>;
    async fn my_reports(&self) -> Result<Vec<Report>, ClientError>;
    async fn patient_reports(&self, aarogya_id: &str) -> Result<Vec<Report>, ClientError>;
    async fn delete_report(&self, report_id: &Uuid) -> Result<(), ClientError>;
    async fn fetch_content(&self, content_id: &Uuid) -> Result<ReportContent, ClientError>;
    async fn summarize_report(&self, report_id: &Uuid) -> Result<SummaryResponse, ClientError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_kinds() {
        assert_eq!(ErrorKind::from_status(400, Some("INVALID_ID")), ErrorKind::InvalidId);
        assert_eq!(ErrorKind::from_status(400, Some("VALIDATION_ERROR")), ErrorKind::Validation);
        assert_eq!(ErrorKind::from_status(401, None), ErrorKind::Unauthorized);
        assert_eq!(ErrorKind::from_status(409, None), ErrorKind::Conflict);
        assert_eq!(ErrorKind::from_status(503, None), ErrorKind::ServiceUnavailable);
        assert_eq!(ErrorKind::from_status(500, Some("INTERNAL")), ErrorKind::Unexpected);
    }

    #[test]
    fn missing_detail_falls_back_to_generic_text() {
        let err = ClientError::from_response(500, None, None);
        assert_eq!(err.detail, GENERIC_FAILURE);
        let err = ClientError::from_response(409, None, Some("  ".into()));
        assert_eq!(err.detail, GENERIC_FAILURE);
        let err = ClientError::from_response(409, None, Some("A pending connection request already exists.".into()));
        assert_eq!(err.to_string(), "A pending connection request already exists.");
    }

    #[test]
    fn stale_state_kinds() {
        assert!(ErrorKind::Conflict.is_stale_state());
        assert!(ErrorKind::NotFound.is_stale_state());
        assert!(!ErrorKind::Forbidden.is_stale_state());
    }
}
