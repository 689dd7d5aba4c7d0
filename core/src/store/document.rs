//! Document table access.

use super::{parse_timestamp, DocumentStore, SqliteStore};
use crate::{
    document::{DocumentStatus, NormalizationOutcome, NormalizedDocument},
    error::{HelixError, HelixResult},
    types::{DocumentId, SubjectId},
};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::str::FromStr;

/// Raw row shape; converted into the domain type outside the rusqlite
/// closure so serde/parse failures surface as HelixError.
struct DocumentRow {
    id: String,
    subject_id: String,
    kind: String,
    extracted_json: String,
    status: String,
    metrics_json: Option<String>,
    failure_reason: Option<String>,
    created_at: String,
}

impl DocumentRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            subject_id: row.get(1)?,
            kind: row.get(2)?,
            extracted_json: row.get(3)?,
            status: row.get(4)?,
            metrics_json: row.get(5)?,
            failure_reason: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn into_document(self) -> HelixResult<NormalizedDocument> {
        Ok(NormalizedDocument {
            kind: self.kind.parse()?,
            extracted: serde_json::from_str(&self.extracted_json)?,
            status: DocumentStatus::from_str(&self.status)?,
            metrics: self
                .metrics_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            failure_reason: self.failure_reason,
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            subject_id: self.subject_id,
        })
    }
}

const SELECT_COLUMNS: &str = "document_id, subject_id, kind, extracted_json, status, \
                              metrics_json, failure_reason, created_at";

impl DocumentStore for SqliteStore {
    fn insert_document(&self, document: &NormalizedDocument) -> HelixResult<()> {
        let extracted = serde_json::to_string(&document.extracted)?;
        let metrics = document
            .metrics
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        self.conn()?.execute(
            "INSERT INTO document (
                document_id, subject_id, kind, extracted_json, status,
                metrics_json, failure_reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                document.id,
                document.subject_id,
                document.kind.as_str(),
                extracted,
                document.status.as_str(),
                metrics,
                document.failure_reason,
                document
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    fn get_document(&self, id: &DocumentId) -> HelixResult<NormalizedDocument> {
        let row = self
            .conn()?
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM document WHERE document_id = ?1"),
                params![id],
                DocumentRow::read,
            )
            .optional()?;
        match row {
            Some(row) => row.into_document(),
            None => Err(HelixError::DocumentNotFound(id.clone())),
        }
    }

    fn set_normalized(&self, id: &DocumentId, outcome: &NormalizationOutcome) -> HelixResult<()> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let updated = match outcome {
            NormalizationOutcome::Metrics(metrics) => {
                let metrics_json = serde_json::to_string(metrics)?;
                self.conn()?.execute(
                    "UPDATE document
                     SET status = 'ok', metrics_json = ?1, failure_reason = NULL,
                         normalized_at = ?2
                     WHERE document_id = ?3",
                    params![metrics_json, now, id],
                )?
            }
            NormalizationOutcome::Failure(reason) => self.conn()?.execute(
                "UPDATE document
                 SET status = 'failed', metrics_json = NULL, failure_reason = ?1,
                     normalized_at = ?2
                 WHERE document_id = ?3",
                params![reason, now, id],
            )?,
        };
        if updated == 0 {
            return Err(HelixError::DocumentNotFound(id.clone()));
        }
        Ok(())
    }

    fn list_documents(&self, subject_id: &SubjectId) -> HelixResult<Vec<NormalizedDocument>> {
        let rows: Vec<DocumentRow> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM document
                 WHERE subject_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map(params![subject_id], DocumentRow::read)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    fn list_unnormalized(&self, subject_id: &SubjectId) -> HelixResult<Vec<NormalizedDocument>> {
        let rows: Vec<DocumentRow> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM document
                 WHERE subject_id = ?1 AND status = 'pending'
                 ORDER BY created_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map(params![subject_id], DocumentRow::read)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        rows.into_iter().map(DocumentRow::into_document).collect()
    }
}
