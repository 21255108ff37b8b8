use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Report metadata. The file body lives in `report_contents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub owner_email: String,
    pub filename: String,
    pub report_type: String,
    pub description: Option<String>,
    pub media_type: String,
    pub size_bytes: i64,
    pub upload_date: DateTime<Utc>,
    pub content_id: Uuid,
}

/// Metadata supplied alongside an uploaded file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub filename: String,
    #[serde(default)]
    pub report_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Readable content of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportContent {
    pub content_id: Uuid,
    pub content: String,
}

/// AI-generated summary of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub report_id: Uuid,
    pub filename: String,
    pub summary: String,
}
