//! Explanation synthesis.
//!
//! Turns the five dimension assessments into the human-readable half
//! of a risk profile: a summary paragraph, impact-ranked key factors,
//! strengths, concerns, and threshold-triggered recommendations.
//! Output is fully deterministic for a given set of assessments.

use crate::scorer::{Dimension, DimensionAssessment, RiskCategory};
use serde::{Deserialize, Serialize};

/// How many impact-ranked factors make the key-factor list.
const KEY_FACTOR_LIMIT: usize = 5;
/// A dimension below this risk score reads as a strength.
const STRENGTH_MAX: f64 = 30.0;
/// A dimension above this risk score reads as a concern.
const CONCERN_MIN: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorDirection {
    /// The dimension sits below the neutral midpoint and helps.
    Positive,
    /// The dimension sits at or above the midpoint and hurts.
    Negative,
}

/// One assessor observation, annotated with how much its dimension
/// moves the composite and in which direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFactor {
    pub dimension: Dimension,
    pub description: String,
    /// Distance of the owning dimension from the neutral 50.
    pub impact: f64,
    pub direction: FactorDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskExplanation {
    pub summary: String,
    pub key_factors: Vec<KeyFactor>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Build the explanation from the five assessments.
pub fn synthesize(
    helix_score: f64,
    category: RiskCategory,
    assessments: &[DimensionAssessment],
) -> RiskExplanation {
    // Rank descending by risk; ties resolve in assessment order so the
    // output stays deterministic.
    let mut ranked: Vec<&DimensionAssessment> = assessments.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    let summary = match (ranked.first(), ranked.last()) {
        (Some(worst), Some(best)) => format!(
            "Overall helix score of {:.1} places this subject in the {} band. \
             The dominant risk driver is the {} dimension at {:.1}, while the \
             {} dimension is the best managed at {:.1}. Scoring confidence \
             reflects the share of expected inputs that were available.",
            helix_score,
            category.as_str(),
            worst.dimension.label(),
            worst.score,
            best.dimension.label(),
            best.score,
        ),
        _ => format!(
            "Overall helix score of {:.1} places this subject in the {} band.",
            helix_score,
            category.as_str()
        ),
    };

    let mut key_factors: Vec<KeyFactor> = assessments
        .iter()
        .flat_map(|a| {
            a.factors.iter().map(|f| KeyFactor {
                dimension: a.dimension,
                description: f.clone(),
                impact: (a.score - 50.0).abs(),
                direction: if a.score < 50.0 {
                    FactorDirection::Positive
                } else {
                    FactorDirection::Negative
                },
            })
        })
        .collect();
    key_factors.sort_by(|a, b| b.impact.total_cmp(&a.impact));
    key_factors.truncate(KEY_FACTOR_LIMIT);

    let strengths: Vec<String> = ranked
        .iter()
        .rev()
        .filter(|a| a.score < STRENGTH_MAX)
        .map(|a| {
            format!(
                "Well-managed {} profile (risk {:.1})",
                a.dimension.label(),
                a.score
            )
        })
        .collect();

    let concerns: Vec<String> = ranked
        .iter()
        .filter(|a| a.score > CONCERN_MIN)
        .map(|a| {
            format!(
                "Elevated {} risk (score {:.1})",
                a.dimension.label(),
                a.score
            )
        })
        .collect();

    let recommendations = recommendations_for(assessments);

    RiskExplanation {
        summary,
        key_factors,
        strengths,
        concerns,
        recommendations,
    }
}

/// Static per-dimension recommendations, emitted when a dimension
/// crosses its trigger threshold.
fn recommendations_for(assessments: &[DimensionAssessment]) -> Vec<String> {
    let mut out = Vec::new();
    for a in assessments {
        match a.dimension {
            Dimension::Financial if a.score > 60.0 => out.push(
                "Reduce recurring debt obligations and stabilize month-to-month \
                 cash flow before taking on new credit."
                    .to_string(),
            ),
            Dimension::Behavioral if a.score > 60.0 => out.push(
                "Set up automatic payments for recurring bills to build a \
                 consistent payment record."
                    .to_string(),
            ),
            Dimension::Alternative if a.score < 40.0 => out.push(
                "Documented assets and residential stability support eligibility \
                 for secured products."
                    .to_string(),
            ),
            Dimension::Fraud if a.score > 50.0 => out.push(
                "Complete additional identity verification to clear outstanding \
                 fraud signals."
                    .to_string(),
            ),
            _ => {}
        }
    }
    out
}
