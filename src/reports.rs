//! Patient-owned medical reports.
//!
//! Patients upload and delete their own reports. A doctor may read a
//! patient's reports only while an accepted connection exists between
//! the two.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db;
use crate::error::{parse_id, require_patient, PortalError};
use crate::models::{
    is_valid_aarogya_id, Caller, Report, ReportContent, ReportSummary, Role, UploadMetadata,
};
use crate::summarizer::ReportSummarizer;

/// Media types accepted for upload, as guessed from the filename.
pub const ALLOWED_MEDIA_TYPES: [&str; 4] =
    ["application/pdf", "text/plain", "image/png", "image/jpeg"];

pub const NO_CONTENT_TEXT: &str = "No content text found.";

const DEFAULT_REPORT_TYPE: &str = "other";

/// Media type for a filename, if it is one the portal accepts.
pub fn accepted_media_type(filename: &str) -> Option<&'static str> {
    let guessed = mime_guess::from_path(filename).first()?;
    ALLOWED_MEDIA_TYPES
        .iter()
        .copied()
        .find(|allowed| *allowed == guessed.essence_str())
}

/// Whether `caller` may read reports owned by `owner_email`.
fn can_read(conn: &Connection, caller: &Caller, owner_email: &str) -> Result<bool, PortalError> {
    Ok(match caller.role {
        Role::Patient => caller.email == owner_email,
        Role::Doctor => db::is_connected(conn, &caller.email, owner_email)?,
    })
}

/// Text layer of a digital PDF. Scanned or unreadable files yield `None`
/// and are stored without text.
fn extract_pdf_text(bytes: &[u8]) -> Option<String> {
    let pages = match pdf_extract::extract_text_from_mem_by_pages(bytes) {
        Ok(pages) => pages,
        Err(e) => {
            tracing::warn!(error = %e, "PDF text extraction failed");
            return None;
        }
    };
    let text = pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    if text.is_empty() {
        tracing::debug!(pages = pages.len(), "PDF has no text layer");
        None
    } else {
        Some(text)
    }
}

pub fn upload(
    conn: &Connection,
    caller: &Caller,
    meta: &UploadMetadata,
    bytes: &[u8],
    max_bytes: usize,
    now: &DateTime<Utc>,
) -> Result<Report, PortalError> {
    require_patient(caller, "Only patients can upload reports.")?;

    let filename = meta.filename.trim();
    if filename.is_empty() {
        return Err(PortalError::Validation("A filename is required.".into()));
    }
    if bytes.is_empty() {
        return Err(PortalError::Validation("Uploaded file is empty.".into()));
    }
    if bytes.len() > max_bytes {
        return Err(PortalError::Validation(format!(
            "File exceeds the {max_bytes}-byte upload limit."
        )));
    }
    let media_type = accepted_media_type(filename).ok_or_else(|| {
        PortalError::Validation(format!(
            "Unsupported file type for {filename}. Allowed: PDF, plain text, PNG, JPEG."
        ))
    })?;

    let content_text = match media_type {
        "text/plain" => {
            let text = std::str::from_utf8(bytes).map_err(|_| {
                PortalError::Validation("Text reports must be UTF-8 encoded.".into())
            })?;
            Some(text.to_string())
        }
        "application/pdf" => extract_pdf_text(bytes),
        _ => None,
    };

    let report = Report {
        id: Uuid::new_v4(),
        owner_email: caller.email.clone(),
        filename: filename.to_string(),
        report_type: meta
            .report_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_REPORT_TYPE)
            .to_string(),
        description: meta
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from),
        media_type: media_type.to_string(),
        size_bytes: bytes.len() as i64,
        upload_date: *now,
        content_id: Uuid::new_v4(),
    };
    db::insert_report(conn, &report, content_text.as_deref(), bytes)?;

    tracing::info!(report_id = %report.id, media_type, size = bytes.len(), "Report uploaded");
    Ok(report)
}

/// The calling patient's own reports, newest first.
pub fn list_own(conn: &Connection, caller: &Caller) -> Result<Vec<Report>, PortalError> {
    require_patient(caller, "Only patients have their own reports.")?;
    Ok(db::list_reports_for_owner(conn, &caller.email)?)
}

/// Reports of the patient with `aarogya_id`, if the caller may read them.
pub fn list_for_patient(
    conn: &Connection,
    caller: &Caller,
    aarogya_id: &str,
) -> Result<Vec<Report>, PortalError> {
    let aarogya_id = aarogya_id.trim();
    if !is_valid_aarogya_id(aarogya_id) {
        return Err(PortalError::InvalidId(aarogya_id.to_string()));
    }
    let patient = db::get_user_by_aarogya_id(conn, aarogya_id)?
        .filter(|u| u.role == Role::Patient)
        .ok_or_else(|| PortalError::NotFound("Patient not found.".into()))?;

    if !can_read(conn, caller, &patient.email)? {
        tracing::warn!(caller = %caller.email, "Report list refused");
        return Err(PortalError::Forbidden("Not connected to this patient.".into()));
    }
    Ok(db::list_reports_for_owner(conn, &patient.email)?)
}

/// Delete one of the caller's own reports together with its content.
pub fn delete(conn: &Connection, caller: &Caller, report_id: &str) -> Result<(), PortalError> {
    let id = parse_id(report_id, "report_id")?;
    let report = db::get_report(conn, &id)?
        .ok_or_else(|| PortalError::NotFound("Report not found".into()))?;
    if report.owner_email != caller.email {
        tracing::warn!(caller = %caller.email, report_id = %id, "Delete of foreign report refused");
        return Err(PortalError::Forbidden("You can only delete your own reports.".into()));
    }

    if !db::delete_report(conn, &id)? {
        return Err(PortalError::NotFound("Report not found".into()));
    }
    tracing::info!(report_id = %id, "Report deleted");
    Ok(())
}

/// Readable content of a report, by content id.
pub fn fetch_content(
    conn: &Connection,
    caller: &Caller,
    content_id: &str,
) -> Result<ReportContent, PortalError> {
    let content_id = parse_id(content_id, "content_id")?;
    let report = db::get_report_by_content_id(conn, &content_id)?
        .ok_or_else(|| PortalError::NotFound("Content not found.".into()))?;
    if !can_read(conn, caller, &report.owner_email)? {
        return Err(PortalError::Forbidden("Not connected to this patient.".into()));
    }

    let text = db::get_content_text(conn, &content_id)?
        .ok_or_else(|| PortalError::NotFound("Content not found.".into()))?;
    Ok(ReportContent {
        content_id,
        content: text.unwrap_or_else(|| NO_CONTENT_TEXT.to_string()),
    })
}

/// Load a readable report and the text a summary would be built from.
/// Kept separate from [`summarize`] so the database lock is released
/// before the summarizer is awaited.
pub fn summary_source(
    conn: &Connection,
    caller: &Caller,
    report_id: &str,
) -> Result<(Report, String), PortalError> {
    let id = parse_id(report_id, "report_id")?;
    let report = db::get_report(conn, &id)?
        .ok_or_else(|| PortalError::NotFound("Report not found".into()))?;
    if !can_read(conn, caller, &report.owner_email)? {
        return Err(PortalError::Forbidden("Not connected to this patient.".into()));
    }

    let text = db::get_content_text(conn, &report.content_id)?
        .flatten()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            PortalError::Validation(
                "Could not extract text from the report. It might be an image-only file.".into(),
            )
        })?;
    Ok((report, text))
}

pub async fn summarize(
    summarizer: &dyn ReportSummarizer,
    report: &Report,
    text: &str,
) -> Result<ReportSummary, PortalError> {
    let summary = summarizer.summarize(text).await?;
    tracing::info!(report_id = %report.id, "Report summarized");
    Ok(ReportSummary {
        report_id: report.id,
        filename: report.filename.clone(),
        summary,
    })
}
