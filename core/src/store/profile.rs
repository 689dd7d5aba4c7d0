//! Risk profile and history table access.

use super::{parse_timestamp, ProfileStore, SqliteStore};
use crate::{
    error::HelixResult,
    profile::{DimensionScores, RiskProfile, RiskProfileHistoryEntry},
    scorer::RiskFlags,
    types::{ProfileId, SubjectId},
};
use chrono::SecondsFormat;
use rusqlite::{params, OptionalExtension, Row};

struct ProfileRow {
    profile_id: String,
    subject_id: String,
    helix_score: f64,
    category: String,
    letter_grade: String,
    financial: f64,
    behavioral: f64,
    alternative: f64,
    environmental: f64,
    fraud: f64,
    confidence: f64,
    high_risk: bool,
    requires_manual_review: bool,
    fast_track_eligible: bool,
    prime_customer: bool,
    explanation_json: String,
    created_at: String,
}

impl ProfileRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            profile_id: row.get(0)?,
            subject_id: row.get(1)?,
            helix_score: row.get(2)?,
            category: row.get(3)?,
            letter_grade: row.get(4)?,
            financial: row.get(5)?,
            behavioral: row.get(6)?,
            alternative: row.get(7)?,
            environmental: row.get(8)?,
            fraud: row.get(9)?,
            confidence: row.get(10)?,
            high_risk: row.get::<_, i32>(11)? != 0,
            requires_manual_review: row.get::<_, i32>(12)? != 0,
            fast_track_eligible: row.get::<_, i32>(13)? != 0,
            prime_customer: row.get::<_, i32>(14)? != 0,
            explanation_json: row.get(15)?,
            created_at: row.get(16)?,
        })
    }

    fn into_profile(self) -> HelixResult<RiskProfile> {
        Ok(RiskProfile {
            category: self.category.parse()?,
            letter_grade: self.letter_grade.parse()?,
            dimension_scores: DimensionScores {
                financial: self.financial,
                behavioral: self.behavioral,
                alternative: self.alternative,
                environmental: self.environmental,
                fraud: self.fraud,
            },
            flags: RiskFlags {
                high_risk: self.high_risk,
                requires_manual_review: self.requires_manual_review,
                fast_track_eligible: self.fast_track_eligible,
                prime_customer: self.prime_customer,
            },
            explanation: serde_json::from_str(&self.explanation_json)?,
            created_at: parse_timestamp(&self.created_at)?,
            id: self.profile_id,
            subject_id: self.subject_id,
            helix_score: self.helix_score,
            confidence: self.confidence,
        })
    }
}

const SELECT_COLUMNS: &str = "profile_id, subject_id, helix_score, category, letter_grade, \
     financial_score, behavioral_score, alternative_score, environmental_score, fraud_score, \
     confidence, high_risk, requires_manual_review, fast_track_eligible, prime_customer, \
     explanation_json, created_at";

impl ProfileStore for SqliteStore {
    fn append_profile(&self, profile: &RiskProfile) -> HelixResult<()> {
        let explanation = serde_json::to_string(&profile.explanation)?;
        self.conn()?.execute(
            "INSERT INTO risk_profile (
                profile_id, subject_id, helix_score, category, letter_grade,
                financial_score, behavioral_score, alternative_score,
                environmental_score, fraud_score, confidence,
                high_risk, requires_manual_review, fast_track_eligible,
                prime_customer, explanation_json, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)",
            params![
                profile.id,
                profile.subject_id,
                profile.helix_score,
                profile.category.as_str(),
                profile.letter_grade.as_str(),
                profile.dimension_scores.financial,
                profile.dimension_scores.behavioral,
                profile.dimension_scores.alternative,
                profile.dimension_scores.environmental,
                profile.dimension_scores.fraud,
                profile.confidence,
                profile.flags.high_risk as i32,
                profile.flags.requires_manual_review as i32,
                profile.flags.fast_track_eligible as i32,
                profile.flags.prime_customer as i32,
                explanation,
                profile
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    fn append_history(&self, entry: &RiskProfileHistoryEntry) -> HelixResult<()> {
        self.conn()?.execute(
            "INSERT INTO risk_profile_history (
                profile_id, subject_id, helix_score, category,
                financial_score, behavioral_score, alternative_score,
                environmental_score, fraud_score, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                entry.profile_id,
                entry.subject_id,
                entry.helix_score,
                entry.category.as_str(),
                entry.dimension_scores.financial,
                entry.dimension_scores.behavioral,
                entry.dimension_scores.alternative,
                entry.dimension_scores.environmental,
                entry.dimension_scores.fraud,
                entry
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    fn latest_profile(&self, subject_id: &SubjectId) -> HelixResult<Option<RiskProfile>> {
        let row = self
            .conn()?
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM risk_profile
                     WHERE subject_id = ?1
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![subject_id],
                ProfileRow::read,
            )
            .optional()?;
        row.map(ProfileRow::into_profile).transpose()
    }

    fn prior_profile(
        &self,
        subject_id: &SubjectId,
        excluding: &ProfileId,
    ) -> HelixResult<Option<RiskProfile>> {
        let row = self
            .conn()?
            .query_row(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM risk_profile
                     WHERE subject_id = ?1 AND profile_id != ?2
                     ORDER BY created_at DESC, rowid DESC LIMIT 1"
                ),
                params![subject_id, excluding],
                ProfileRow::read,
            )
            .optional()?;
        row.map(ProfileRow::into_profile).transpose()
    }

    fn history_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> HelixResult<Vec<RiskProfileHistoryEntry>> {
        struct HistoryRow {
            profile_id: String,
            subject_id: String,
            helix_score: f64,
            category: String,
            financial: f64,
            behavioral: f64,
            alternative: f64,
            environmental: f64,
            fraud: f64,
            created_at: String,
        }

        let rows: Vec<HistoryRow> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT profile_id, subject_id, helix_score, category,
                        financial_score, behavioral_score, alternative_score,
                        environmental_score, fraud_score, created_at
                 FROM risk_profile_history
                 WHERE subject_id = ?1
                 ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map(params![subject_id], |row| {
                    Ok(HistoryRow {
                        profile_id: row.get(0)?,
                        subject_id: row.get(1)?,
                        helix_score: row.get(2)?,
                        category: row.get(3)?,
                        financial: row.get(4)?,
                        behavioral: row.get(5)?,
                        alternative: row.get(6)?,
                        environmental: row.get(7)?,
                        fraud: row.get(8)?,
                        created_at: row.get(9)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter()
            .map(|r| {
                Ok(RiskProfileHistoryEntry {
                    category: r.category.parse()?,
                    dimension_scores: DimensionScores {
                        financial: r.financial,
                        behavioral: r.behavioral,
                        alternative: r.alternative,
                        environmental: r.environmental,
                        fraud: r.fraud,
                    },
                    created_at: parse_timestamp(&r.created_at)?,
                    profile_id: r.profile_id,
                    subject_id: r.subject_id,
                    helix_score: r.helix_score,
                })
            })
            .collect()
    }
}
