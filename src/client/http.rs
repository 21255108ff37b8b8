//! [`PortalApi`] over HTTP with a bearer session token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use super::api::{ClientError, ErrorKind, PortalApi};
use crate::models::{
    Appointment, AppointmentRequestBody, ConfirmBody, ConfirmResponse, ConnectionRequest,
    MessageResponse, PatientProfile, Report, ReportContent, ResolveAction, SuccessResponse,
    SummaryResponse, UploadMetadata,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Error body as the server sends it. Both fields are optional so bodies
/// from proxies or older servers still yield a usable error.
#[derive(Deserialize)]
struct ErrorPayload {
    detail: Option<String>,
    code: Option<String>,
}

pub struct HttpPortalApi {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl HttpPortalApi {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::new(ErrorKind::Transport, format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{path}", self.base_url)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    /// Send with the session token; any non-2xx becomes a `ClientError`.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let payload = response.json::<ErrorPayload>().await.ok();
        let (code, detail) = match payload {
            Some(p) => (p.code, p.detail),
            None => (None, None),
        };
        tracing::warn!(status = status.as_u16(), ?code, "Portal request failed");
        Err(ClientError::from_response(status.as_u16(), code.as_deref(), detail))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.execute(request).await?;
        response.json::<T>().await.map_err(|e| {
            ClientError::new(ErrorKind::Unexpected, format!("Unreadable response: {e}"))
        })
    }
}

fn transport_error(err: reqwest::Error) -> ClientError {
    let detail = if err.is_timeout() {
        "The portal did not respond in time.".to_string()
    } else if err.is_connect() {
        "Could not reach the portal.".to_string()
    } else {
        format!("Request failed: {err}")
    };
    ClientError::new(ErrorKind::Transport, detail)
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn search_patient(&self, aarogya_id: &str) -> Result<PatientProfile, ClientError> {
        self.fetch(self.get("/patients/search").query(&[("aarogya_id", aarogya_id)]))
            .await
    }

    async fn send_connection_request(
        &self,
        aarogya_id: &str,
    ) -> Result<MessageResponse, ClientError> {
        self.fetch(self.post(&format!("/connections/request/{aarogya_id}")))
            .await
    }

    async fn pending_connections(&self) -> Result<Vec<ConnectionRequest>, ClientError> {
        self.fetch(self.get("/connections/pending")).await
    }

    async fn resolve_connection(
        &self,
        request_id: &Uuid,
        action: ResolveAction,
    ) -> Result<MessageResponse, ClientError> {
        self.fetch(self.post(&format!("/connections/{request_id}/{action}")))
            .await
    }

    async fn request_appointment(
        &self,
        body: &AppointmentRequestBody,
    ) -> Result<Appointment, ClientError> {
        self.fetch(self.post("/appointments/request").json(body)).await
    }

    async fn appointments(&self) -> Result<Vec<Appointment>, ClientError> {
        self.fetch(self.get("/appointments")).await
    }

    async fn confirm_appointment(
        &self,
        appointment_id: &Uuid,
        appointment_time: &str,
    ) -> Result<ConfirmResponse, ClientError> {
        let body = ConfirmBody {
            appointment_time: appointment_time.to_string(),
        };
        self.fetch(self.post(&format!("/appointments/{appointment_id}/confirm")).json(&body))
            .await
    }

    async fn reject_appointment(
        &self,
        appointment_id: &Uuid,
    ) -> Result<MessageResponse, ClientError> {
        self.fetch(self.post(&format!("/appointments/{appointment_id}/reject")))
            .await
    }

    async fn activate_link(&self, appointment_id: &Uuid) -> Result<SuccessResponse, ClientError> {
        self.fetch(self.post(&format!("/appointments/{appointment_id}/activate-link")))
            .await
    }

    async fn complete_appointment(
        &self,
        appointment_id: &Uuid,
    ) -> Result<SuccessResponse, ClientError> {
        self.fetch(self.post(&format!("/appointments/{appointment_id}/complete")))
            .await
    }

    async fn upload_report(
        &self,
        meta: &UploadMetadata,
        bytes: Vec<u8>,
    ) -> Result<Report, ClientError> {
        let file = Part::bytes(bytes).file_name(meta.filename.clone());
        let mut form = Form::new().part("file", file);
        if let Some(kind) = &meta.report_type {
            form = form.text("report_type", kind.clone());
        }
        if let Some(description) = &meta.description {
            form = form.text("description", description.clone());
        }
        self.fetch(self.post("/reports/upload").multipart(form)).await
    }

    async fn my_reports(&self) -> Result<Vec<Report>, ClientError> {
        self.fetch(self.get("/reports/mine")).await
    }

    async fn patient_reports(&self, aarogya_id: &str) -> Result<Vec<Report>, ClientError> {
        self.fetch(self.get(&format!("/patients/{aarogya_id}/reports")))
            .await
    }

    async fn delete_report(&self, report_id: &Uuid) -> Result<(), ClientError> {
        let request = self.client.delete(self.url(&format!("/reports/{report_id}")));
        self.execute(request).await?;
        Ok(())
    }

    async fn fetch_content(&self, content_id: &Uuid) -> Result<ReportContent, ClientError> {
        self.fetch(self.get(&format!("/reports/content/{content_id}")))
            .await
    }

    async fn summarize_report(&self, report_id: &Uuid) -> Result<SummaryResponse, ClientError> {
        self.fetch(self.post(&format!("/reports/{report_id}/summarize")))
            .await
    }
}
