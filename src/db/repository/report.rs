use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{col_time, col_uuid, to_db_time};
use crate::db::DatabaseError;
use crate::models::Report;

const REPORT_COLUMNS: &str = "id, owner_email, filename, report_type, description, media_type, \
     size_bytes, upload_date, content_id";

fn map_report(row: &Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: col_uuid(row, 0)?,
        owner_email: row.get(1)?,
        filename: row.get(2)?,
        report_type: row.get(3)?,
        description: row.get(4)?,
        media_type: row.get(5)?,
        size_bytes: row.get(6)?,
        upload_date: col_time(row, 7)?,
        content_id: col_uuid(row, 8)?,
    })
}

/// Insert the report row and its content in one transaction.
pub fn insert_report(
    conn: &Connection,
    report: &Report,
    content_text: Option<&str>,
    raw: &[u8],
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO report_contents (id, content_text, raw, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            report.content_id.to_string(),
            content_text,
            raw,
            to_db_time(&report.upload_date),
        ],
    )
    .map_err(DatabaseError::from_write)?;

    tx.execute(
        "INSERT INTO reports (id, owner_email, filename, report_type, description,
                              media_type, size_bytes, upload_date, content_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            report.id.to_string(),
            report.owner_email,
            report.filename,
            report.report_type,
            report.description,
            report.media_type,
            report.size_bytes,
            to_db_time(&report.upload_date),
            report.content_id.to_string(),
        ],
    )
    .map_err(DatabaseError::from_write)?;

    tx.commit()?;
    Ok(())
}

pub fn get_report(conn: &Connection, id: &Uuid) -> Result<Option<Report>, DatabaseError> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id.to_string()], map_report)
        .optional()?)
}

pub fn get_report_by_content_id(
    conn: &Connection,
    content_id: &Uuid,
) -> Result<Option<Report>, DatabaseError> {
    let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE content_id = ?1");
    Ok(conn
        .query_row(&sql, params![content_id.to_string()], map_report)
        .optional()?)
}

/// Reports owned by a patient, newest first.
pub fn list_reports_for_owner(
    conn: &Connection,
    owner_email: &str,
) -> Result<Vec<Report>, DatabaseError> {
    let sql = format!(
        "SELECT {REPORT_COLUMNS} FROM reports
         WHERE owner_email = ?1 ORDER BY upload_date DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_email], map_report)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Extracted text for a content row. Outer `None` means the row is
/// missing; inner `None` means nothing was extracted.
pub fn get_content_text(
    conn: &Connection,
    content_id: &Uuid,
) -> Result<Option<Option<String>>, DatabaseError> {
    Ok(conn
        .query_row(
            "SELECT content_text FROM report_contents WHERE id = ?1",
            params![content_id.to_string()],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?)
}

/// Delete a report and its stored content. Returns `false` if no report
/// with that id exists.
pub fn delete_report(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let content_id: Option<String> = tx
        .query_row(
            "SELECT content_id FROM reports WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let Some(content_id) = content_id else {
        return Ok(false);
    };

    tx.execute("DELETE FROM reports WHERE id = ?1", params![id.to_string()])?;
    tx.execute("DELETE FROM report_contents WHERE id = ?1", params![content_id])?;
    tx.commit()?;
    Ok(true)
}
