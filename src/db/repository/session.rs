use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::user::{map_user, USER_COLUMNS};
use super::{col_time, to_db_time};
use crate::db::DatabaseError;
use crate::models::UserProfile;

/// Store a session keyed by the SHA-256 hex digest of its bearer token.
pub fn insert_session(
    conn: &Connection,
    token_hash: &str,
    user_id: &Uuid,
    created_at: &DateTime<Utc>,
    expires_at: &DateTime<Utc>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            token_hash,
            user_id.to_string(),
            to_db_time(created_at),
            to_db_time(expires_at),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(())
}

/// Resolve a token hash to its user, ignoring sessions that expired
/// before `now`.
pub fn find_session_user(
    conn: &Connection,
    token_hash: &str,
    now: &DateTime<Utc>,
) -> Result<Option<UserProfile>, DatabaseError> {
    let sql = format!(
        "SELECT {USER_COLUMNS}, s.expires_at FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.token_hash = ?1"
    );
    let found = conn
        .query_row(&sql, params![token_hash], |row| {
            Ok((map_user(row)?, col_time(row, 13)?))
        })
        .optional()?;

    Ok(found.and_then(|(user, expires_at)| (expires_at > *now).then_some(user)))
}

/// Remove sessions that expired before `now`. Returns rows deleted.
pub fn prune_expired_sessions(
    conn: &Connection,
    now: &DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![to_db_time(now)],
    )?;
    Ok(deleted)
}
