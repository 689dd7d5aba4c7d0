//! Risk profile snapshots.
//!
//! RULE: a RiskProfile is immutable once written. Every scoring run
//! appends a brand-new snapshot plus one history row; "current" means
//! most-recent-by-created_at, never an update in place.

use crate::{
    explanation::RiskExplanation,
    scorer::{Dimension, LetterGrade, RiskCategory, RiskFlags, ScoreReport},
    types::{ProfileId, SubjectId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The five dimension scores, flattened for storage and display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub financial: f64,
    pub behavioral: f64,
    pub alternative: f64,
    pub environmental: f64,
    pub fraud: f64,
}

impl DimensionScores {
    pub fn from_report(report: &ScoreReport) -> Self {
        Self {
            financial: report.dimension_score(Dimension::Financial),
            behavioral: report.dimension_score(Dimension::Behavioral),
            alternative: report.dimension_score(Dimension::Alternative),
            environmental: report.dimension_score(Dimension::Environmental),
            fraud: report.dimension_score(Dimension::Fraud),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub id: ProfileId,
    pub subject_id: SubjectId,
    pub helix_score: f64,
    pub category: RiskCategory,
    pub letter_grade: LetterGrade,
    pub dimension_scores: DimensionScores,
    pub confidence: f64,
    pub flags: RiskFlags,
    pub explanation: RiskExplanation,
    pub created_at: DateTime<Utc>,
}

impl RiskProfile {
    /// Mint a new snapshot from a scoring report.
    pub fn from_report(subject_id: &str, report: &ScoreReport) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            helix_score: report.helix_score,
            category: report.category,
            letter_grade: report.letter_grade,
            dimension_scores: DimensionScores::from_report(report),
            confidence: report.confidence,
            flags: report.flags,
            explanation: report.explanation.clone(),
            created_at: Utc::now(),
        }
    }

    /// The denormalized history row written alongside this snapshot.
    pub fn history_entry(&self) -> RiskProfileHistoryEntry {
        RiskProfileHistoryEntry {
            profile_id: self.id.clone(),
            subject_id: self.subject_id.clone(),
            helix_score: self.helix_score,
            category: self.category,
            dimension_scores: self.dimension_scores,
            created_at: self.created_at,
        }
    }
}

/// Lighter copy of a profile kept for trend queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfileHistoryEntry {
    pub profile_id: ProfileId,
    pub subject_id: SubjectId,
    pub helix_score: f64,
    pub category: RiskCategory,
    pub dimension_scores: DimensionScores,
    pub created_at: DateTime<Utc>,
}
