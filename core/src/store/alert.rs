//! Risk alert table access.

use super::{parse_timestamp, AlertStore, SqliteStore};
use crate::{
    error::HelixResult,
    monitoring::RiskAlert,
    types::SubjectId,
};
use chrono::SecondsFormat;
use rusqlite::{params, Row};

struct AlertRow {
    id: String,
    subject_id: String,
    alert_type: String,
    severity: String,
    message: String,
    previous_score: Option<f64>,
    current_score: f64,
    delta: Option<f64>,
    resolved: bool,
    created_at: String,
}

impl AlertRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            subject_id: row.get(1)?,
            alert_type: row.get(2)?,
            severity: row.get(3)?,
            message: row.get(4)?,
            previous_score: row.get(5)?,
            current_score: row.get(6)?,
            delta: row.get(7)?,
            resolved: row.get::<_, i32>(8)? != 0,
            created_at: row.get(9)?,
        })
    }

    fn into_alert(self) -> HelixResult<RiskAlert> {
        Ok(RiskAlert {
            alert_type: self.alert_type.parse()?,
            severity: self.severity.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
            id: self.id,
            subject_id: self.subject_id,
            message: self.message,
            previous_score: self.previous_score,
            current_score: self.current_score,
            delta: self.delta,
            resolved: self.resolved,
        })
    }
}

impl AlertStore for SqliteStore {
    fn append_alert(&self, alert: &RiskAlert) -> HelixResult<()> {
        self.conn()?.execute(
            "INSERT INTO risk_alert (
                alert_id, subject_id, alert_type, severity, message,
                previous_score, current_score, delta, resolved, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                alert.id,
                alert.subject_id,
                alert.alert_type.as_str(),
                alert.severity.as_str(),
                alert.message,
                alert.previous_score,
                alert.current_score,
                alert.delta,
                alert.resolved as i32,
                alert
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    fn alerts_for_subject(&self, subject_id: &SubjectId) -> HelixResult<Vec<RiskAlert>> {
        let rows: Vec<AlertRow> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT alert_id, subject_id, alert_type, severity, message,
                        previous_score, current_score, delta, resolved, created_at
                 FROM risk_alert
                 WHERE subject_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map(params![subject_id], AlertRow::read)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        rows.into_iter().map(AlertRow::into_alert).collect()
    }
}
