//! Report endpoints.
//!
//! `POST /api/reports/upload` takes multipart form data with a `file`
//! part and optional `report_type` / `description` text parts.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Caller, Report, ReportContent, SummaryResponse, UploadMetadata};
use crate::reports;

pub async fn upload(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Report>), ApiError> {
    let mut multipart = multipart?;
    let mut meta = UploadMetadata::default();
    let mut file: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                meta.filename = field.file_name().unwrap_or_default().to_string();
                file = Some(field.bytes().await.map_err(malformed)?.to_vec());
            }
            "report_type" => meta.report_type = Some(field.text().await.map_err(malformed)?),
            "description" => meta.description = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }
    let bytes = file.ok_or_else(|| ApiError::Validation("A file is required.".into()))?;

    let report = {
        let conn = ctx.state.db()?;
        reports::upload(
            &conn,
            &caller,
            &meta,
            &bytes,
            ctx.state.config.max_upload_bytes,
            &Utc::now(),
        )?
    };
    Ok((StatusCode::CREATED, Json(report)))
}

fn malformed(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation(format!("Invalid upload: {}", err.body_text()))
}

/// `GET /api/reports/mine`
pub async fn mine(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let conn = ctx.state.db()?;
    Ok(Json(reports::list_own(&conn, &caller)?))
}

/// `GET /api/patients/:aarogya_id/reports`
pub async fn for_patient(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(aarogya_id): Path<String>,
) -> Result<Json<Vec<Report>>, ApiError> {
    let conn = ctx.state.db()?;
    Ok(Json(reports::list_for_patient(&conn, &caller, &aarogya_id)?))
}

/// `DELETE /api/reports/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(report_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.state.db()?;
    reports::delete(&conn, &caller, &report_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/reports/content/:content_id`
pub async fn content(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(content_id): Path<String>,
) -> Result<Json<ReportContent>, ApiError> {
    let conn = ctx.state.db()?;
    Ok(Json(reports::fetch_content(&conn, &caller, &content_id)?))
}

/// `POST /api/reports/:id/summarize`
pub async fn summarize(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(report_id): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let (report, text) = {
        let conn = ctx.state.db()?;
        reports::summary_source(&conn, &caller, &report_id)?
    }; // MutexGuard dropped here, before the summarizer is awaited

    let summary = reports::summarize(ctx.state.summarizer(), &report, &text).await?;
    Ok(Json(SummaryResponse {
        filename: summary.filename,
        summary: summary.summary,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};

    use crate::api::testing::{request, send, TestApi, PATIENT_ID};
    use crate::summarizer::MockSummarizer;

    const BOUNDARY: &str = "portal-test-boundary";

    fn multipart_upload(token: &str, filename: &str, bytes: &[u8], report_type: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
        if let Some(kind) = report_type {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"report_type\"\r\n\r\n{kind}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/reports/upload")
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn upload_text(api: &TestApi, text: &str) -> serde_json::Value {
        let req = multipart_upload(&api.patient, "cbc.txt", text.as_bytes(), Some("lab_result"));
        let (status, body) = send(api, req).await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn upload_and_read_back() {
        let api = TestApi::new();
        let report = upload_text(&api, "Hb 13.2 g/dL").await;
        assert_eq!(report["report_type"], "lab_result");
        assert_eq!(report["media_type"], "text/plain");

        let (_, mine) = send(&api, request("GET", "/api/reports/mine", Some(&api.patient), None)).await;
        assert_eq!(mine.as_array().unwrap().len(), 1);

        let uri = format!("/api/reports/content/{}", report["content_id"].as_str().unwrap());
        let (status, content) = send(&api, request("GET", &uri, Some(&api.patient), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content["content"], "Hb 13.2 g/dL");
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected() {
        let api = TestApi::new();
        let req = multipart_upload(&api.patient, "notes.exe", b"MZ", None);
        let (status, body) = send(&api, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn non_multipart_upload_is_validation_error() {
        let api = TestApi::new();
        let req = request("POST", "/api/reports/upload", Some(&api.patient), Some(serde_json::json!({})));
        let (status, body) = send(&api, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn doctor_needs_connection_to_read_reports() {
        let api = TestApi::new();
        upload_text(&api, "lipid panel").await;
        let uri = format!("/api/patients/{PATIENT_ID}/reports");

        let (status, _) = send(&api, request("GET", &uri, Some(&api.doctor), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        api.connect_doctor_and_patient();
        let (status, listed) = send(&api, request("GET", &uri, Some(&api.doctor), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn only_owner_deletes() {
        let api = TestApi::new();
        let report = upload_text(&api, "x-ray notes").await;
        let uri = format!("/api/reports/{}", report["id"].as_str().unwrap());

        let (status, _) = send(&api, request("DELETE", &uri, Some(&api.other_patient), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&api, request("DELETE", &uri, Some(&api.patient), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(body.is_null());

        let (status, _) = send(&api, request("DELETE", &uri, Some(&api.patient), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn summarize_uses_configured_summarizer() {
        let api = TestApi::with_summarizer(MockSummarizer {
            response: Ok("Haemoglobin within range.".into()),
        });
        let report = upload_text(&api, "Hb 13.2 g/dL").await;
        let uri = format!("/api/reports/{}/summarize", report["id"].as_str().unwrap());

        let (status, body) = send(&api, request("POST", &uri, Some(&api.patient), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "cbc.txt");
        assert_eq!(body["summary"], "Haemoglobin within range.");
    }

    #[tokio::test]
    async fn summarizer_outage_is_503_and_keeps_report() {
        let api = TestApi::new();
        let report = upload_text(&api, "Hb 13.2 g/dL").await;
        let uri = format!("/api/reports/{}/summarize", report["id"].as_str().unwrap());

        let (status, body) = send(&api, request("POST", &uri, Some(&api.patient), None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "SERVICE_UNAVAILABLE");

        let (_, mine) = send(&api, request("GET", "/api/reports/mine", Some(&api.patient), None)).await;
        assert_eq!(mine.as_array().unwrap().len(), 1);
    }
}
