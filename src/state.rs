//! Shared application state for the HTTP API.
//!
//! One SQLite connection behind a `Mutex`, plus the collaborators the
//! managers consult. Handlers take the lock, run synchronous repository
//! work and drop the guard before any `.await`.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;

use crate::config::PortalConfig;
use crate::db::seed::{apply_seed, load_seed_file, SeedError};
use crate::db::{self, DatabaseError};
use crate::error::PortalError;
use crate::meeting::{MeetingLinkProvider, PlaceholderMeetingLinks};
use crate::summarizer::{self, DisabledSummarizer, ReportSummarizer};
use crate::triage::{KeywordTriage, SeverityPredictor};

pub struct PortalState {
    db: Mutex<Connection>,
    pub config: PortalConfig,
    triage: Box<dyn SeverityPredictor>,
    meetings: Box<dyn MeetingLinkProvider>,
    summarizer: Box<dyn ReportSummarizer>,
}

impl PortalState {
    /// Assemble state around an already-migrated connection with the
    /// default collaborators.
    pub fn new(conn: Connection, config: PortalConfig) -> Self {
        Self {
            db: Mutex::new(conn),
            config,
            triage: Box::new(KeywordTriage),
            meetings: Box::new(PlaceholderMeetingLinks::default()),
            summarizer: Box::new(DisabledSummarizer),
        }
    }

    /// Open the configured database, apply the seed file if one is set
    /// and build the configured summarizer.
    pub fn open(config: PortalConfig) -> Result<Self, StateError> {
        let conn = db::open_database(&config.database_path)?;

        if let Some(path) = &config.seed_path {
            let seed = load_seed_file(path)?;
            apply_seed(&conn, &seed, &Utc::now())?;
        }
        let pruned = db::prune_expired_sessions(&conn, &Utc::now())?;
        if pruned > 0 {
            tracing::info!(pruned, "Removed expired sessions");
        }

        let summarizer = summarizer::from_config(&config).map_err(StateError::Summarizer)?;
        Ok(Self::new(conn, config).with_summarizer(summarizer))
    }

    /// In-memory database with default configuration.
    pub fn in_memory() -> Result<Self, StateError> {
        let conn = db::open_memory_database()?;
        Ok(Self::new(conn, PortalConfig::default()))
    }

    pub fn with_summarizer(mut self, summarizer: Box<dyn ReportSummarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn with_triage(mut self, triage: Box<dyn SeverityPredictor>) -> Self {
        self.triage = triage;
        self
    }

    pub fn with_meetings(mut self, meetings: Box<dyn MeetingLinkProvider>) -> Self {
        self.meetings = meetings;
        self
    }

    // ── Accessors ───────────────────────────────────────────

    /// Lock the database connection.
    pub fn db(&self) -> Result<MutexGuard<'_, Connection>, StateError> {
        self.db.lock().map_err(|_| StateError::LockPoisoned)
    }

    pub fn triage(&self) -> &dyn SeverityPredictor {
        self.triage.as_ref()
    }

    pub fn meetings(&self) -> &dyn MeetingLinkProvider {
        self.meetings.as_ref()
    }

    pub fn summarizer(&self) -> &dyn ReportSummarizer {
        self.summarizer.as_ref()
    }
}

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Seed error: {0}")]
    Seed(#[from] SeedError),
    #[error("Summarizer setup failed: {0}")]
    Summarizer(PortalError),
}
