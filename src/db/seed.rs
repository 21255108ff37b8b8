//! Startup seed for local deployments.
//!
//! Registration and login live outside this crate. A JSON seed file lets
//! an operator provision users and pre-issued bearer tokens so the API can
//! be driven without those services. Applying a seed is idempotent: users
//! that already exist (by email) and tokens already stored are skipped.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use super::repository::{get_user_by_email, insert_session, insert_user};
use super::DatabaseError;
use crate::api::types::hash_token;
use crate::models::{is_valid_aarogya_id, Role, UserProfile};

/// Default session lifetime when a seed entry does not name one.
const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 30;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Cannot read seed file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Malformed seed file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid seed entry: {0}")]
    Invalid(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub sessions: Vec<SeedSession>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub email: String,
    pub aarogya_id: String,
    pub role: Role,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_authorized: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSession {
    pub email: String,
    pub token: String,
    #[serde(default)]
    pub ttl_hours: Option<i64>,
}

/// Counts of rows actually written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub sessions_created: usize,
}

pub fn load_seed_file(path: &Path) -> Result<SeedFile, SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn apply_seed(
    conn: &Connection,
    seed: &SeedFile,
    now: &DateTime<Utc>,
) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();

    for entry in &seed.users {
        if !is_valid_aarogya_id(&entry.aarogya_id) {
            return Err(SeedError::Invalid(format!(
                "{}: malformed Aarogya ID {}",
                entry.email, entry.aarogya_id
            )));
        }
        let prefix = match entry.role {
            Role::Patient => "RP",
            Role::Doctor => "RD",
        };
        if !entry.aarogya_id.starts_with(prefix) {
            return Err(SeedError::Invalid(format!(
                "{}: Aarogya ID {} does not match role {}",
                entry.email, entry.aarogya_id, entry.role
            )));
        }
        if get_user_by_email(conn, &entry.email)?.is_some() {
            continue;
        }

        let user = UserProfile {
            id: Uuid::new_v4(),
            email: entry.email.clone(),
            aarogya_id: entry.aarogya_id.clone(),
            role: entry.role,
            display_name: entry.display_name.clone(),
            age: entry.age,
            gender: entry.gender.clone(),
            phone_number: entry.phone_number.clone(),
            blood_group: entry.blood_group.clone(),
            specialization: entry.specialization.clone(),
            is_public: entry.is_public,
            is_authorized: entry.is_authorized,
            registration_date: *now,
        };
        insert_user(conn, &user)?;
        summary.users_created += 1;
    }

    for entry in &seed.sessions {
        let user = get_user_by_email(conn, &entry.email)?.ok_or_else(|| {
            SeedError::Invalid(format!("session for unknown user {}", entry.email))
        })?;
        let ttl = Duration::hours(entry.ttl_hours.unwrap_or(DEFAULT_SESSION_TTL_HOURS));
        match insert_session(conn, &hash_token(&entry.token), &user.id, now, &(*now + ttl)) {
            Ok(()) => summary.sessions_created += 1,
            Err(DatabaseError::ConstraintViolation(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(
        users = summary.users_created,
        sessions = summary.sessions_created,
        "Seed applied"
    );
    Ok(summary)
}
