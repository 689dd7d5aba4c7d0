//! Persistence boundary.
//!
//! The core consumes three narrow store traits; the HTTP/service layer
//! is free to implement them over whatever schema it owns. `SqliteStore`
//! is the bundled reference implementation used by tests and the
//! headless runner.
//!
//! RULE: only this module talks SQL. Pipeline code calls store
//! methods — it never executes statements directly.

mod alert;
mod document;
mod profile;

use crate::{
    document::{NormalizationOutcome, NormalizedDocument},
    error::{HelixError, HelixResult},
    monitoring::RiskAlert,
    profile::{RiskProfile, RiskProfileHistoryEntry},
    types::{DocumentId, ProfileId, SubjectId},
};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

/// Document intake and normalized-metrics slot.
pub trait DocumentStore {
    fn insert_document(&self, document: &NormalizedDocument) -> HelixResult<()>;
    fn get_document(&self, id: &DocumentId) -> HelixResult<NormalizedDocument>;
    /// Replace the document's normalized slot in place. Re-runs
    /// overwrite earlier outcomes; the slot is not append-only.
    fn set_normalized(&self, id: &DocumentId, outcome: &NormalizationOutcome) -> HelixResult<()>;
    /// All documents for a subject, newest first.
    fn list_documents(&self, subject_id: &SubjectId) -> HelixResult<Vec<NormalizedDocument>>;
    /// Documents still awaiting normalization, newest first.
    fn list_unnormalized(&self, subject_id: &SubjectId) -> HelixResult<Vec<NormalizedDocument>>;
}

/// Append-only profile snapshots and their history rows.
pub trait ProfileStore {
    fn append_profile(&self, profile: &RiskProfile) -> HelixResult<()>;
    fn append_history(&self, entry: &RiskProfileHistoryEntry) -> HelixResult<()>;
    fn latest_profile(&self, subject_id: &SubjectId) -> HelixResult<Option<RiskProfile>>;
    /// Most recent snapshot other than `excluding` — the comparison
    /// baseline for monitoring a freshly appended profile.
    fn prior_profile(
        &self,
        subject_id: &SubjectId,
        excluding: &ProfileId,
    ) -> HelixResult<Option<RiskProfile>>;
    /// Trend history, newest first.
    fn history_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> HelixResult<Vec<RiskProfileHistoryEntry>>;
}

/// Append-only monitoring alerts.
pub trait AlertStore {
    fn append_alert(&self, alert: &RiskAlert) -> HelixResult<()>;
    fn alerts_for_subject(&self, subject_id: &SubjectId) -> HelixResult<Vec<RiskAlert>>;
}

/// Everything the orchestrator needs from persistence.
pub trait HelixStore: DocumentStore + ProfileStore + AlertStore + Send + Sync {}

impl<T: DocumentStore + ProfileStore + AlertStore + Send + Sync> HelixStore for T {}

/// Bundled SQLite implementation. The connection sits behind a mutex
/// so one store can be shared across subject workers.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &str) -> HelixResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance. In-memory and
        // shared-cache databases ignore it.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> HelixResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> HelixResult<()> {
        self.conn()?
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> HelixResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| HelixError::Other(anyhow::anyhow!("store mutex poisoned")))
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> HelixResult<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&chrono::Utc))
        .map_err(|e| HelixError::Other(anyhow::anyhow!("bad timestamp '{raw}': {e}")))
}
