//! Client-side workflow store.
//!
//! `WorkflowStore` binds one signed-in role to cached lists and turns
//! typed [`Action`]s into [`PortalApi`] calls. It refuses actions the role
//! cannot perform, validates input before anything is sent, locks the
//! triggering control while a request is in flight and applies
//! appointment transitions optimistically, reconciling against a fresh
//! server list afterwards. The server stays authoritative: every list is
//! re-fetched rather than patched from local diffs.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use super::api::{ClientError, ErrorKind, PortalApi};
use super::view::{self, AppointmentBoard, PendingConnectionsView, LOAD_ERROR};
use crate::models::{
    is_valid_aarogya_id, Appointment, AppointmentAction, AppointmentRequestBody, ConnectionRequest,
    PatientProfile, Report, ReportContent, ResolveAction, Role, SummaryResponse, UploadMetadata,
};
use crate::workflow;

// ═══════════════════════════════════════════════════════════
// State
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum ListState<T> {
    NotLoaded,
    Loaded(Vec<T>),
    /// Last load failed; holds the error detail.
    Failed(String),
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self::NotLoaded
    }
}

impl<T> ListState<T> {
    /// Loaded items, empty otherwise.
    pub fn items(&self) -> &[T] {
        match self {
            Self::Loaded(items) => items,
            _ => &[],
        }
    }
}

/// The doctor's last patient lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub patient: PatientProfile,
    /// Once set, the send control stays disabled for this result.
    pub request_sent: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    pub pending_connections: ListState<ConnectionRequest>,
    pub appointments: ListState<Appointment>,
    pub reports: ListState<Report>,
    pub search: Option<SearchResult>,
    pub content: Option<ReportContent>,
    pub summary: Option<SummaryResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    /// Must be acknowledged by the user.
    Blocking,
    /// Shown in place, the page stays usable.
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

// ═══════════════════════════════════════════════════════════
// Actions
// ═══════════════════════════════════════════════════════════

/// A UI control that can be locked while its request is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Control {
    PatientSearch,
    SendRequest,
    PendingConnections,
    Connection(Uuid),
    AppointmentForm,
    AppointmentList,
    Appointment(Uuid),
    ReportUpload,
    ReportList,
    Report(Uuid),
    Content(Uuid),
}

#[derive(Debug, Clone)]
pub enum Action {
    SearchPatient { aarogya_id: String },
    /// Sends to the patient in the current search result.
    SendConnectionRequest,
    LoadPendingConnections,
    ResolveConnection { request_id: Uuid, action: ResolveAction },
    RequestAppointment(AppointmentRequestBody),
    ConfirmAppointment { appointment_id: Uuid, appointment_time: String },
    RejectAppointment { appointment_id: Uuid },
    ActivateLink { appointment_id: Uuid },
    CompleteAppointment { appointment_id: Uuid },
    LoadAppointments,
    UploadReport { meta: UploadMetadata, bytes: Vec<u8> },
    /// `None` loads the caller's own reports.
    LoadReports { patient: Option<String> },
    DeleteReport { report_id: Uuid },
    FetchContent { content_id: Uuid },
    SummarizeReport { report_id: Uuid },
}

impl Action {
    /// Role allowed to dispatch this action, if restricted.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Self::SearchPatient { .. } | Self::SendConnectionRequest => Some(Role::Doctor),
            Self::LoadPendingConnections => Some(Role::Patient),
            Self::ResolveConnection { action, .. } => Some(action.actor()),
            Self::RequestAppointment(_) => Some(Role::Patient),
            Self::ConfirmAppointment { .. } => Some(AppointmentAction::Confirm.actor()),
            Self::RejectAppointment { .. } => Some(AppointmentAction::Reject.actor()),
            Self::ActivateLink { .. } => Some(AppointmentAction::ActivateLink.actor()),
            Self::CompleteAppointment { .. } => Some(AppointmentAction::Complete.actor()),
            Self::UploadReport { .. } | Self::DeleteReport { .. } => Some(Role::Patient),
            Self::LoadReports { patient: None } => Some(Role::Patient),
            Self::LoadReports { patient: Some(_) } => Some(Role::Doctor),
            Self::LoadAppointments
            | Self::FetchContent { .. }
            | Self::SummarizeReport { .. } => None,
        }
    }

    pub fn control(&self) -> Control {
        match self {
            Self::SearchPatient { .. } => Control::PatientSearch,
            Self::SendConnectionRequest => Control::SendRequest,
            Self::LoadPendingConnections => Control::PendingConnections,
            Self::ResolveConnection { request_id, .. } => Control::Connection(*request_id),
            Self::RequestAppointment(_) => Control::AppointmentForm,
            Self::ConfirmAppointment { appointment_id, .. }
            | Self::RejectAppointment { appointment_id }
            | Self::ActivateLink { appointment_id }
            | Self::CompleteAppointment { appointment_id } => Control::Appointment(*appointment_id),
            Self::LoadAppointments => Control::AppointmentList,
            Self::UploadReport { .. } => Control::ReportUpload,
            Self::LoadReports { .. } => Control::ReportList,
            Self::DeleteReport { report_id } | Self::SummarizeReport { report_id } => {
                Control::Report(*report_id)
            }
            Self::FetchContent { content_id } => Control::Content(*content_id),
        }
    }

    /// List loads and link activation fail inline; everything else blocks.
    fn failure_level(&self) -> NoticeLevel {
        match self {
            Self::LoadPendingConnections
            | Self::LoadAppointments
            | Self::LoadReports { .. }
            | Self::ActivateLink { .. } => NoticeLevel::Inline,
            _ => NoticeLevel::Blocking,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed,
    /// The control was locked; nothing was sent.
    Busy,
    Failed(ClientError),
}

// ═══════════════════════════════════════════════════════════
// Store
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
struct Inner {
    state: StoreState,
    locked: HashSet<Control>,
    notices: Vec<Notice>,
}

pub struct WorkflowStore<A> {
    api: A,
    role: Role,
    inner: Mutex<Inner>,
}

impl<A: PortalApi> WorkflowStore<A> {
    pub fn new(api: A, role: Role) -> Self {
        Self {
            api,
            role,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// A copy of the cached state.
    pub fn snapshot(&self) -> StoreState {
        self.inner().state.clone()
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.inner().notices)
    }

    pub fn is_locked(&self, control: &Control) -> bool {
        let inner = self.inner();
        inner.locked.contains(control)
            || (*control == Control::SendRequest && send_disabled(&inner.state))
    }

    pub fn pending_connections_view(&self) -> PendingConnectionsView {
        view::pending_connections_view(&self.inner().state)
    }

    pub fn appointment_board(&self) -> AppointmentBoard {
        view::appointment_board(self.role, &self.inner().state)
    }

    /// Handle one user action.
    pub async fn dispatch(&self, action: Action) -> Outcome {
        if let Some(required) = action.required_role() {
            if required != self.role {
                let err = ClientError::new(
                    ErrorKind::Forbidden,
                    format!("This action is not available to a {}.", self.role),
                );
                return self.fail(NoticeLevel::Blocking, err);
            }
        }
        if let Err(err) = self.validate(&action) {
            return self.fail(NoticeLevel::Blocking, err);
        }

        let control = action.control();
        if !self.lock(&control) {
            tracing::debug!(?control, "Dispatch ignored, control locked");
            return Outcome::Busy;
        }

        let level = action.failure_level();
        let result = self.run(action).await;
        self.inner().locked.remove(&control);

        match result {
            Ok(()) => Outcome::Completed,
            Err(err) => self.fail(level, err),
        }
    }

    // ── Internals ───────────────────────────────────────────

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        f(&mut self.inner().state)
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.inner().notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    fn fail(&self, level: NoticeLevel, err: ClientError) -> Outcome {
        self.notify(level, err.detail.clone());
        Outcome::Failed(err)
    }

    fn lock(&self, control: &Control) -> bool {
        let mut inner = self.inner();
        if *control == Control::SendRequest && send_disabled(&inner.state) {
            return false;
        }
        inner.locked.insert(control.clone())
    }

    fn validate(&self, action: &Action) -> Result<(), ClientError> {
        match action {
            Action::SearchPatient { aarogya_id } => check_aarogya_id(aarogya_id),
            Action::SendConnectionRequest if self.inner().state.search.is_none() => Err(
                ClientError::new(ErrorKind::Validation, "Search for a patient first."),
            ),
            Action::RequestAppointment(body) => {
                if body.reason.trim().is_empty() {
                    return Err(ClientError::new(
                        ErrorKind::Validation,
                        "Please describe the reason for your visit.",
                    ));
                }
                check_aarogya_id(&body.doctor_aarogya_id)
            }
            Action::ConfirmAppointment {
                appointment_time, ..
            } if appointment_time.trim().is_empty() => Err(ClientError::new(
                ErrorKind::Validation,
                "Please select an appointment time.",
            )),
            Action::UploadReport { meta, bytes } => {
                if meta.filename.trim().is_empty() || bytes.is_empty() {
                    return Err(ClientError::new(
                        ErrorKind::Validation,
                        "Please choose a file to upload.",
                    ));
                }
                Ok(())
            }
            Action::LoadReports { patient: Some(id) } => check_aarogya_id(id),
            _ => Ok(()),
        }
    }

    async fn run(&self, action: Action) -> Result<(), ClientError> {
        match action {
            Action::SearchPatient { aarogya_id } => {
                match self.api.search_patient(aarogya_id.trim()).await {
                    Ok(patient) => {
                        // An open request already exists for this pair
                        let request_sent = patient.connection_status.is_some();
                        self.update(|s| s.search = Some(SearchResult { patient, request_sent }));
                        Ok(())
                    }
                    Err(err) => {
                        self.update(|s| s.search = None);
                        Err(err)
                    }
                }
            }

            Action::SendConnectionRequest => {
                let aarogya_id = self
                    .update(|s| s.search.as_ref().map(|r| r.patient.aarogya_id.clone()))
                    .ok_or_else(|| {
                        ClientError::new(ErrorKind::Validation, "Search for a patient first.")
                    })?;
                match self.api.send_connection_request(&aarogya_id).await {
                    Ok(response) => {
                        self.mark_request_sent();
                        self.notify(NoticeLevel::Info, response.message);
                        Ok(())
                    }
                    Err(err) => {
                        if err.kind == ErrorKind::Conflict {
                            self.mark_request_sent();
                        }
                        Err(err)
                    }
                }
            }

            Action::LoadPendingConnections => {
                let result = self.api.pending_connections().await;
                self.store_list(result, |s| &mut s.pending_connections)
            }

            Action::ResolveConnection { request_id, action } => {
                match self.api.resolve_connection(&request_id, action).await {
                    Ok(response) => {
                        self.update(|s| {
                            if let ListState::Loaded(items) = &mut s.pending_connections {
                                items.retain(|r| r.id != request_id);
                            }
                        });
                        self.notify(NoticeLevel::Info, response.message);
                        Ok(())
                    }
                    Err(err) => {
                        if err.kind.is_stale_state() {
                            let fetch = self.api.pending_connections();
                            self.reconcile(fetch, |s| &mut s.pending_connections).await;
                        }
                        Err(err)
                    }
                }
            }

            Action::RequestAppointment(body) => {
                let result = self.api.request_appointment(&body).await;
                if let Ok(created) = &result {
                    self.notify(
                        NoticeLevel::Info,
                        format!(
                            "Appointment requested. Predicted severity: {}.",
                            created.predicted_severity
                        ),
                    );
                }
                if result.as_ref().map_or_else(|e| e.kind.is_stale_state(), |_| true) {
                    self.reconcile(self.api.appointments(), |s| &mut s.appointments).await;
                }
                result.map(|_| ())
            }

            Action::ConfirmAppointment {
                appointment_id,
                appointment_time,
            } => {
                self.transition_appointment(
                    appointment_id,
                    AppointmentAction::Confirm,
                    self.api.confirm_appointment(&appointment_id, appointment_time.trim()),
                )
                .await
            }
            Action::RejectAppointment { appointment_id } => {
                self.transition_appointment(
                    appointment_id,
                    AppointmentAction::Reject,
                    self.api.reject_appointment(&appointment_id),
                )
                .await
            }
            Action::ActivateLink { appointment_id } => {
                self.transition_appointment(
                    appointment_id,
                    AppointmentAction::ActivateLink,
                    self.api.activate_link(&appointment_id),
                )
                .await
            }
            Action::CompleteAppointment { appointment_id } => {
                self.transition_appointment(
                    appointment_id,
                    AppointmentAction::Complete,
                    self.api.complete_appointment(&appointment_id),
                )
                .await
            }

            Action::LoadAppointments => {
                let result = self.api.appointments().await;
                self.store_list(result, |s| &mut s.appointments)
            }

            Action::UploadReport { meta, bytes } => {
                let report = self.api.upload_report(&meta, bytes).await?;
                self.notify(NoticeLevel::Info, format!("{} uploaded.", report.filename));
                self.reconcile(self.api.my_reports(), |s| &mut s.reports).await;
                Ok(())
            }

            Action::LoadReports { patient } => {
                let result = match &patient {
                    Some(id) => self.api.patient_reports(id.trim()).await,
                    None => self.api.my_reports().await,
                };
                self.store_list(result, |s| &mut s.reports)
            }

            Action::DeleteReport { report_id } => match self.api.delete_report(&report_id).await {
                Ok(()) => {
                    self.update(|s| {
                        if let ListState::Loaded(items) = &mut s.reports {
                            items.retain(|r| r.id != report_id);
                        }
                    });
                    self.notify(NoticeLevel::Info, "Report deleted.");
                    Ok(())
                }
                Err(err) => {
                    if err.kind.is_stale_state() {
                        self.reconcile(self.api.my_reports(), |s| &mut s.reports).await;
                    }
                    Err(err)
                }
            },

            Action::FetchContent { content_id } => {
                let content = self.api.fetch_content(&content_id).await?;
                self.update(|s| s.content = Some(content));
                Ok(())
            }

            Action::SummarizeReport { report_id } => {
                let summary = self.api.summarize_report(&report_id).await?;
                self.update(|s| s.summary = Some(summary));
                Ok(())
            }
        }
    }

    /// Apply `action` to the cached appointment, await the server and
    /// reconcile. A failed call restores the cache as it was; a stale one
    /// also re-fetches instead of retrying.
    async fn transition_appointment<T>(
        &self,
        id: Uuid,
        action: AppointmentAction,
        call: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<(), ClientError> {
        let previous = self.update(|s| {
            let ListState::Loaded(items) = &mut s.appointments else {
                return None;
            };
            let appointment = items.iter_mut().find(|a| a.id == id)?;
            let before = appointment.clone();
            match workflow::apply(appointment.state(), action) {
                Ok(next) => appointment.set_state(next),
                // The server decides; our copy may be behind
                Err(e) => tracing::debug!(%e, "Skipping optimistic update"),
            }
            Some(before)
        });

        match call.await {
            Ok(_) => {
                self.notify(NoticeLevel::Info, success_message(action));
                self.reconcile(self.api.appointments(), |s| &mut s.appointments).await;
                Ok(())
            }
            Err(err) => {
                // Other entries may already hold newer server state
                if let Some(previous) = previous {
                    self.update(move |s| {
                        if let ListState::Loaded(items) = &mut s.appointments {
                            if let Some(slot) = items.iter_mut().find(|a| a.id == id) {
                                *slot = previous;
                            }
                        }
                    });
                }
                if err.kind.is_stale_state() {
                    tracing::info!(appointment_id = %id, "Transition lost to newer server state");
                    self.reconcile(self.api.appointments(), |s| &mut s.appointments).await;
                }
                Err(err)
            }
        }
    }

    /// Replace a list with a fresh server copy. On failure the cached
    /// copy is kept and an inline notice is queued.
    async fn reconcile<T>(
        &self,
        fetch: impl Future<Output = Result<Vec<T>, ClientError>>,
        slot: impl FnOnce(&mut StoreState) -> &mut ListState<T>,
    ) {
        match fetch.await {
            Ok(items) => self.update(|s| *slot(s) = ListState::Loaded(items)),
            Err(err) => {
                tracing::warn!(detail = %err.detail, "List refresh failed");
                self.notify(NoticeLevel::Inline, LOAD_ERROR);
            }
        }
    }

    fn store_list<T>(
        &self,
        result: Result<Vec<T>, ClientError>,
        slot: impl FnOnce(&mut StoreState) -> &mut ListState<T>,
    ) -> Result<(), ClientError> {
        self.update(|s| {
            let list = slot(s);
            match result {
                Ok(items) => {
                    *list = ListState::Loaded(items);
                    Ok(())
                }
                Err(err) => {
                    *list = ListState::Failed(err.detail.clone());
                    Err(err)
                }
            }
        })
    }

    fn mark_request_sent(&self) {
        self.update(|s| {
            if let Some(result) = s.search.as_mut() {
                result.request_sent = true;
            }
        });
    }
}

fn send_disabled(state: &StoreState) -> bool {
    state.search.as_ref().is_some_and(|r| r.request_sent)
}

fn check_aarogya_id(raw: &str) -> Result<(), ClientError> {
    if is_valid_aarogya_id(raw.trim()) {
        Ok(())
    } else {
        Err(ClientError::new(ErrorKind::InvalidId, "Invalid AarogyaID format."))
    }
}

fn success_message(action: AppointmentAction) -> &'static str {
    match action {
        AppointmentAction::Confirm => "Appointment confirmed.",
        AppointmentAction::Reject => "Appointment request rejected.",
        AppointmentAction::ActivateLink => "Meeting link is now active.",
        AppointmentAction::Complete => "Appointment marked as completed.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::models::{
        AppointmentStatus, ConfirmResponse, ConnectionStatus, MessageResponse, Severity,
        SuccessResponse,
    };
    use crate::workflow::CardAction;

    const PATIENT_ID: &str = "RP0501000001";
    const DOCTOR_ID: &str = "RD0501000001";

    /// In-memory portal that records every call it receives.
    #[derive(Default)]
    struct FakeApi {
        appointments: Mutex<Vec<Appointment>>,
        pending: Mutex<Vec<ConnectionRequest>>,
        reports: Mutex<Vec<Report>>,
        patient: Option<PatientProfile>,
        fail_next: Mutex<Option<ClientError>>,
        fail_on: Mutex<HashMap<&'static str, ClientError>>,
        delay: Option<Duration>,
        delay_on: HashMap<&'static str, Duration>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl FakeApi {
        async fn enter(&self, call: &'static str) -> Result<(), ClientError> {
            self.calls.lock().unwrap().push(call);
            if let Some(delay) = self.delay_on.get(call).copied().or(self.delay) {
                tokio::time::sleep(delay).await;
            }
            let scripted = self.fail_on.lock().unwrap().remove(call);
            let scripted = scripted.or_else(|| self.fail_next.lock().unwrap().take());
            scripted.map_or(Ok(()), Err)
        }

        fn count(&self, call: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
        }

        fn fail_next(&self, kind: ErrorKind, detail: &str) {
            *self.fail_next.lock().unwrap() = Some(ClientError::new(kind, detail));
        }

        fn fail_on(&self, call: &'static str, kind: ErrorKind, detail: &str) {
            self.fail_on.lock().unwrap().insert(call, ClientError::new(kind, detail));
        }

        fn transition(&self, id: &Uuid, action: AppointmentAction) -> Result<(), ClientError> {
            let mut list = self.appointments.lock().unwrap();
            let appointment = list
                .iter_mut()
                .find(|a| a.id == *id)
                .ok_or_else(|| ClientError::new(ErrorKind::NotFound, "Appointment not found."))?;
            let next = workflow::apply(appointment.state(), action)
                .map_err(|e| ClientError::new(ErrorKind::Conflict, e.to_string()))?;
            appointment.set_state(next);
            Ok(())
        }
    }

    #[async_trait]
    impl PortalApi for FakeApi {
        async fn search_patient(&self, _aarogya_id: &str) -> Result<PatientProfile, ClientError> {
            self.enter("search_patient").await?;
            self.patient
                .clone()
                .ok_or_else(|| ClientError::new(ErrorKind::NotFound, "No patient found"))
        }

        async fn send_connection_request(&self, _aarogya_id: &str) -> Result<MessageResponse, ClientError> {
            self.enter("send_connection_request").await?;
            Ok(MessageResponse::new("Connection request sent successfully."))
        }

        async fn pending_connections(&self) -> Result<Vec<ConnectionRequest>, ClientError> {
            self.enter("pending_connections").await?;
            Ok(self.pending.lock().unwrap().clone())
        }

        async fn resolve_connection(
            &self,
            request_id: &Uuid,
            _action: ResolveAction,
        ) -> Result<MessageResponse, ClientError> {
            self.enter("resolve_connection").await?;
            let mut pending = self.pending.lock().unwrap();
            let before = pending.len();
            pending.retain(|r| r.id != *request_id);
            if pending.len() == before {
                return Err(ClientError::new(ErrorKind::NotFound, "Pending request not found"));
            }
            Ok(MessageResponse::new("Connection request accepted."))
        }

        async fn request_appointment(
            &self,
            body: &AppointmentRequestBody,
        ) -> Result<Appointment, ClientError> {
            self.enter("request_appointment").await?;
            let created = appointment(AppointmentStatus::Pending, false);
            let created = Appointment {
                reason: body.reason.clone(),
                ..created
            };
            self.appointments.lock().unwrap().push(created.clone());
            Ok(created)
        }

        async fn appointments(&self) -> Result<Vec<Appointment>, ClientError> {
            self.enter("appointments").await?;
            Ok(self.appointments.lock().unwrap().clone())
        }

        async fn confirm_appointment(
            &self,
            appointment_id: &Uuid,
            _appointment_time: &str,
        ) -> Result<ConfirmResponse, ClientError> {
            self.enter("confirm_appointment").await?;
            self.transition(appointment_id, AppointmentAction::Confirm)?;
            Ok(ConfirmResponse {
                message: "Appointment confirmed.".into(),
                appointment_time: Utc::now(),
                meeting_link: format!("https://meet.google.com/aarogya-{appointment_id}"),
            })
        }

        async fn reject_appointment(&self, appointment_id: &Uuid) -> Result<MessageResponse, ClientError> {
            self.enter("reject_appointment").await?;
            self.transition(appointment_id, AppointmentAction::Reject)?;
            Ok(MessageResponse::new("Appointment request rejected."))
        }

        async fn activate_link(&self, appointment_id: &Uuid) -> Result<SuccessResponse, ClientError> {
            self.enter("activate_link").await?;
            self.transition(appointment_id, AppointmentAction::ActivateLink)?;
            Ok(SuccessResponse { success: true })
        }

        async fn complete_appointment(&self, appointment_id: &Uuid) -> Result<SuccessResponse, ClientError> {
            self.enter("complete_appointment").await?;
            self.transition(appointment_id, AppointmentAction::Complete)?;
            Ok(SuccessResponse { success: true })
        }

        async fn upload_report(
            &self,
            meta: &UploadMetadata,
            bytes: Vec<u8>,
        ) -> Result<Report, ClientError> {
            self.enter("upload_report").await?;
            let created = Report {
                filename: meta.filename.clone(),
                size_bytes: bytes.len() as i64,
                ..report()
            };
            self.reports.lock().unwrap().insert(0, created.clone());
            Ok(created)
        }

        async fn my_reports(&self) -> Result<Vec<Report>, ClientError> {
            self.enter("my_reports").await?;
            Ok(self.reports.lock().unwrap().clone())
        }

        async fn patient_reports(&self, _aarogya_id: &str) -> Result<Vec<Report>, ClientError> {
            self.enter("patient_reports").await?;
            Ok(self.reports.lock().unwrap().clone())
        }

        async fn delete_report(&self, report_id: &Uuid) -> Result<(), ClientError> {
            self.enter("delete_report").await?;
            self.reports.lock().unwrap().retain(|r| r.id != *report_id);
            Ok(())
        }

        async fn fetch_content(&self, content_id: &Uuid) -> Result<ReportContent, ClientError> {
            self.enter("fetch_content").await?;
            Ok(ReportContent {
                content_id: *content_id,
                content: "Hb 13.2 g/dL".into(),
            })
        }

        async fn summarize_report(&self, _report_id: &Uuid) -> Result<SummaryResponse, ClientError> {
            self.enter("summarize_report").await?;
            Ok(SummaryResponse {
                filename: "cbc.txt".into(),
                summary: "Normal haemoglobin.".into(),
            })
        }
    }

    fn appointment(status: AppointmentStatus, is_link_active: bool) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_email: "ravi@mail.in".into(),
            doctor_email: "meera@clinic.in".into(),
            reason: "fever".into(),
            patient_notes: None,
            predicted_severity: Severity::Moderate,
            status,
            appointment_time: None,
            meeting_link: None,
            is_link_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn report() -> Report {
        Report {
            id: Uuid::new_v4(),
            owner_email: "ravi@mail.in".into(),
            filename: "cbc.txt".into(),
            report_type: "lab_result".into(),
            description: None,
            media_type: "text/plain".into(),
            size_bytes: 12,
            upload_date: Utc::now(),
            content_id: Uuid::new_v4(),
        }
    }

    fn connection_request() -> ConnectionRequest {
        ConnectionRequest {
            id: Uuid::new_v4(),
            doctor_email: "meera@clinic.in".into(),
            patient_email: "ravi@mail.in".into(),
            status: ConnectionStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    fn patient_profile(connection_status: Option<ConnectionStatus>) -> PatientProfile {
        PatientProfile {
            id: Uuid::new_v4(),
            aarogya_id: PATIENT_ID.into(),
            email: "ravi@mail.in".into(),
            display_name: "Ravi".into(),
            age: Some(41),
            gender: None,
            phone_number: None,
            blood_group: None,
            connection_status,
        }
    }

    /// Doctor store whose API already holds `appointments`, loaded into the cache.
    async fn doctor_store(appointments: Vec<Appointment>) -> WorkflowStore<FakeApi> {
        let api = FakeApi {
            appointments: Mutex::new(appointments),
            ..FakeApi::default()
        };
        let store = WorkflowStore::new(api, Role::Doctor);
        assert_eq!(store.dispatch(Action::LoadAppointments).await, Outcome::Completed);
        store
    }

    fn cached(store: &WorkflowStore<FakeApi>, id: Uuid) -> Appointment {
        store
            .snapshot()
            .appointments
            .items()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn wrong_role_is_refused_locally() {
        let store = WorkflowStore::new(FakeApi::default(), Role::Patient);
        let outcome = store
            .dispatch(Action::ConfirmAppointment {
                appointment_id: Uuid::new_v4(),
                appointment_time: "2030-05-01T10:00".into(),
            })
            .await;
        assert!(matches!(outcome, Outcome::Failed(ref e) if e.kind == ErrorKind::Forbidden));
        assert!(store.api().calls.lock().unwrap().is_empty());

        let notices = store.take_notices();
        assert_eq!(notices[0].level, NoticeLevel::Blocking);
        assert!(store.take_notices().is_empty());
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_server() {
        let doctor = WorkflowStore::new(FakeApi::default(), Role::Doctor);
        let blank_time = doctor
            .dispatch(Action::ConfirmAppointment {
                appointment_id: Uuid::new_v4(),
                appointment_time: "   ".into(),
            })
            .await;
        assert!(matches!(blank_time, Outcome::Failed(ref e) if e.kind == ErrorKind::Validation));

        let bad_id = doctor
            .dispatch(Action::SearchPatient {
                aarogya_id: "RP12".into(),
            })
            .await;
        assert!(matches!(bad_id, Outcome::Failed(ref e) if e.kind == ErrorKind::InvalidId));
        assert!(doctor.api().calls.lock().unwrap().is_empty());

        let patient = WorkflowStore::new(FakeApi::default(), Role::Patient);
        let blank_reason = patient
            .dispatch(Action::RequestAppointment(AppointmentRequestBody {
                doctor_aarogya_id: DOCTOR_ID.into(),
                reason: " ".into(),
                patient_notes: None,
            }))
            .await;
        assert!(matches!(blank_reason, Outcome::Failed(ref e) if e.kind == ErrorKind::Validation));
        let empty_upload = patient
            .dispatch(Action::UploadReport {
                meta: UploadMetadata {
                    filename: "cbc.txt".into(),
                    ..UploadMetadata::default()
                },
                bytes: Vec::new(),
            })
            .await;
        assert!(matches!(empty_upload, Outcome::Failed(ref e) if e.kind == ErrorKind::Validation));
        assert!(patient.api().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn locked_control_returns_busy_without_calling_server() {
        let confirmed = appointment(AppointmentStatus::Confirmed, false);
        let id = confirmed.id;
        let api = FakeApi {
            appointments: Mutex::new(vec![confirmed]),
            delay: Some(Duration::from_millis(50)),
            ..FakeApi::default()
        };
        let store = WorkflowStore::new(api, Role::Doctor);

        let (first, second) = tokio::join!(
            store.dispatch(Action::ActivateLink { appointment_id: id }),
            store.dispatch(Action::ActivateLink { appointment_id: id }),
        );
        assert_eq!(first, Outcome::Completed);
        assert_eq!(second, Outcome::Busy);
        assert_eq!(store.api().count("activate_link"), 1);
        assert!(!store.is_locked(&Control::Appointment(id)));
    }

    #[tokio::test]
    async fn optimistic_update_is_reconciled_with_server() {
        let confirmed = appointment(AppointmentStatus::Confirmed, false);
        let id = confirmed.id;
        let store = doctor_store(vec![confirmed]).await;

        assert_eq!(
            store.dispatch(Action::ActivateLink { appointment_id: id }).await,
            Outcome::Completed
        );
        assert!(cached(&store, id).is_link_active);

        assert_eq!(
            store.dispatch(Action::CompleteAppointment { appointment_id: id }).await,
            Outcome::Completed
        );
        let done = cached(&store, id);
        assert_eq!(done.status, AppointmentStatus::Completed);
        assert!(!done.is_link_active);
        // Initial load plus one reconcile per transition
        assert_eq!(store.api().count("appointments"), 3);
    }

    #[tokio::test]
    async fn failed_transition_restores_cached_state() {
        let confirmed = appointment(AppointmentStatus::Confirmed, true);
        let id = confirmed.id;
        let store = doctor_store(vec![confirmed]).await;
        let before = store.snapshot();

        store.api().fail_next(ErrorKind::ServiceUnavailable, "Try again later");
        let outcome = store.dispatch(Action::CompleteAppointment { appointment_id: id }).await;
        assert!(matches!(outcome, Outcome::Failed(ref e) if e.detail == "Try again later"));
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn failed_transition_keeps_other_appointments_fresh() {
        let first = appointment(AppointmentStatus::Confirmed, false);
        let second = appointment(AppointmentStatus::Confirmed, false);
        let (a, b) = (first.id, second.id);
        let api = FakeApi {
            appointments: Mutex::new(vec![first, second]),
            delay_on: HashMap::from([("complete_appointment", Duration::from_millis(200))]),
            ..FakeApi::default()
        };
        api.fail_on("complete_appointment", ErrorKind::ServiceUnavailable, "down");
        let store = WorkflowStore::new(api, Role::Doctor);
        assert_eq!(store.dispatch(Action::LoadAppointments).await, Outcome::Completed);

        let slow = store.dispatch(Action::CompleteAppointment { appointment_id: a });
        let fast = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            store.dispatch(Action::ActivateLink { appointment_id: b }).await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        assert!(matches!(slow, Outcome::Failed(ref e) if e.detail == "down"));
        assert_eq!(fast, Outcome::Completed);
        assert!(cached(&store, b).is_link_active);
        assert_eq!(cached(&store, a).status, AppointmentStatus::Confirmed);
        assert!(!cached(&store, a).is_link_active);
    }

    #[tokio::test]
    async fn stale_transition_refreshes_instead_of_retrying() {
        let confirmed = appointment(AppointmentStatus::Confirmed, false);
        let id = confirmed.id;
        let store = doctor_store(vec![confirmed]).await;

        // Another client completed it meanwhile
        store.api().transition(&id, AppointmentAction::Complete).unwrap();

        let outcome = store.dispatch(Action::ActivateLink { appointment_id: id }).await;
        assert!(matches!(outcome, Outcome::Failed(ref e) if e.kind == ErrorKind::Conflict));
        assert_eq!(cached(&store, id).status, AppointmentStatus::Completed);
        assert_eq!(store.api().count("activate_link"), 1);

        // Link activation failures are inline, not blocking
        let notices = store.take_notices();
        assert_eq!(notices.last().unwrap().level, NoticeLevel::Inline);
    }

    #[tokio::test]
    async fn resolving_last_request_shows_placeholder() {
        let request = connection_request();
        let id = request.id;
        let api = FakeApi {
            pending: Mutex::new(vec![request]),
            ..FakeApi::default()
        };
        let store = WorkflowStore::new(api, Role::Patient);
        store.dispatch(Action::LoadPendingConnections).await;
        assert!(matches!(store.pending_connections_view(), PendingConnectionsView::Items(ref i) if i.len() == 1));

        let outcome = store
            .dispatch(Action::ResolveConnection {
                request_id: id,
                action: ResolveAction::Accept,
            })
            .await;
        assert_eq!(outcome, Outcome::Completed);
        assert_eq!(
            store.pending_connections_view(),
            PendingConnectionsView::Placeholder(view::NO_PENDING_REQUESTS)
        );
    }

    #[tokio::test]
    async fn sent_request_keeps_send_disabled() {
        let api = FakeApi {
            patient: Some(patient_profile(None)),
            ..FakeApi::default()
        };
        let store = WorkflowStore::new(api, Role::Doctor);
        store
            .dispatch(Action::SearchPatient {
                aarogya_id: PATIENT_ID.into(),
            })
            .await;
        assert!(!store.is_locked(&Control::SendRequest));

        assert_eq!(store.dispatch(Action::SendConnectionRequest).await, Outcome::Completed);
        assert!(store.is_locked(&Control::SendRequest));
        assert_eq!(store.dispatch(Action::SendConnectionRequest).await, Outcome::Busy);
        assert_eq!(store.api().count("send_connection_request"), 1);
    }

    #[tokio::test]
    async fn existing_connection_disables_send_on_search() {
        let api = FakeApi {
            patient: Some(patient_profile(Some(ConnectionStatus::Accepted))),
            ..FakeApi::default()
        };
        let store = WorkflowStore::new(api, Role::Doctor);
        store
            .dispatch(Action::SearchPatient {
                aarogya_id: PATIENT_ID.into(),
            })
            .await;
        assert_eq!(store.dispatch(Action::SendConnectionRequest).await, Outcome::Busy);
    }

    #[tokio::test]
    async fn report_is_removed_only_after_server_confirms() {
        let existing = report();
        let id = existing.id;
        let api = FakeApi {
            reports: Mutex::new(vec![existing]),
            ..FakeApi::default()
        };
        let store = WorkflowStore::new(api, Role::Patient);
        store.dispatch(Action::LoadReports { patient: None }).await;

        store.api().fail_next(ErrorKind::Forbidden, "You can only delete your own reports.");
        let outcome = store.dispatch(Action::DeleteReport { report_id: id }).await;
        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(store.snapshot().reports.items().len(), 1);

        assert_eq!(store.dispatch(Action::DeleteReport { report_id: id }).await, Outcome::Completed);
        assert!(store.snapshot().reports.items().is_empty());
    }

    #[tokio::test]
    async fn failed_list_load_is_inline() {
        let store = WorkflowStore::new(FakeApi::default(), Role::Patient);
        store.api().fail_next(ErrorKind::Transport, "Could not reach the portal.");
        store.dispatch(Action::LoadAppointments).await;

        assert!(matches!(store.appointment_board(), AppointmentBoard::Error(_)));
        assert_eq!(store.take_notices()[0].level, NoticeLevel::Inline);
    }

    #[tokio::test]
    async fn patient_board_reflects_link_state() {
        let waiting = appointment(AppointmentStatus::Confirmed, false);
        let api = FakeApi {
            appointments: Mutex::new(vec![waiting]),
            ..FakeApi::default()
        };
        let store = WorkflowStore::new(api, Role::Patient);
        store.dispatch(Action::LoadAppointments).await;

        let AppointmentBoard::Sections(sections) = store.appointment_board() else {
            panic!("expected sections");
        };
        assert_eq!(sections[0].cards[0].actions, vec![CardAction::WaitingForLink]);
    }

    #[tokio::test]
    async fn content_and_summary_are_cached() {
        let store = WorkflowStore::new(FakeApi::default(), Role::Patient);
        let content_id = Uuid::new_v4();
        store.dispatch(Action::FetchContent { content_id }).await;
        store
            .dispatch(Action::SummarizeReport {
                report_id: Uuid::new_v4(),
            })
            .await;

        let state = store.snapshot();
        assert_eq!(state.content.unwrap().content_id, content_id);
        assert_eq!(state.summary.unwrap().summary, "Normal haemoglobin.");
    }
}
