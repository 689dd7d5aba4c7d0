//! Multi-Dimensional Risk Scorer.
//!
//! Five independent dimension assessors, a weighted blend, a
//! confidence estimate, the category and letter-grade classifiers,
//! and the decision flags. Dimension scores are RISK scores: higher
//! means riskier. Assessors work internally on goodness sub-scores in
//! [0,100] — clamped after every additive adjustment — and report
//! risk = 100 − blended goodness.
//!
//! RULE: scoring is pure. The same feature vector yields bit-identical
//! assessments, scores, confidence, flags, and explanation text.

use crate::{
    config::ScoringConfig,
    error::HelixResult,
    explanation::{self, RiskExplanation},
    feature::FeatureVector,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five risk facets, in blend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Financial,
    Behavioral,
    Alternative,
    Environmental,
    Fraud,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Financial,
        Dimension::Behavioral,
        Dimension::Alternative,
        Dimension::Environmental,
        Dimension::Fraud,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Financial => "financial stability",
            Dimension::Behavioral => "behavioral",
            Dimension::Alternative => "alternative data",
            Dimension::Environmental => "environmental",
            Dimension::Fraud => "fraud risk",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One dimension's verdict: risk score, data confidence, and the
/// observations that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionAssessment {
    pub dimension: Dimension,
    pub score: f64,
    pub confidence: f64,
    pub factors: Vec<String>,
}

/// Five-band risk category over the rounded helix score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Prime,
    NearPrime,
    Subprime,
    DeepSubprime,
    Decline,
}

impl RiskCategory {
    /// Band edges: prime [0,25], near_prime [26,45], subprime [46,65],
    /// deep_subprime [66,85], decline [86,100]. Fractional scores are
    /// rounded to the nearest integer first so the bands partition the
    /// whole range with no gaps.
    pub fn from_score(score: f64) -> Self {
        match score.round().clamp(0.0, 100.0) as u32 {
            0..=25 => RiskCategory::Prime,
            26..=45 => RiskCategory::NearPrime,
            46..=65 => RiskCategory::Subprime,
            66..=85 => RiskCategory::DeepSubprime,
            _ => RiskCategory::Decline,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Prime => "prime",
            RiskCategory::NearPrime => "near_prime",
            RiskCategory::Subprime => "subprime",
            RiskCategory::DeepSubprime => "deep_subprime",
            RiskCategory::Decline => "decline",
        }
    }
}

impl std::str::FromStr for RiskCategory {
    type Err = crate::error::HelixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prime" => Ok(RiskCategory::Prime),
            "near_prime" => Ok(RiskCategory::NearPrime),
            "subprime" => Ok(RiskCategory::Subprime),
            "deep_subprime" => Ok(RiskCategory::DeepSubprime),
            "decline" => Ok(RiskCategory::Decline),
            other => Err(crate::error::HelixError::Validation(format!(
                "unknown risk category '{other}'"
            ))),
        }
    }
}

/// The parallel six-letter grading scheme used elsewhere in the
/// product. Cut points differ from the category bands on purpose;
/// there is no defined mapping between the two, so both are exposed
/// and the consuming layer chooses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl LetterGrade {
    pub fn from_score(score: f64) -> Self {
        match score.round().clamp(0.0, 100.0) as u32 {
            0..=20 => LetterGrade::A,
            21..=35 => LetterGrade::B,
            36..=50 => LetterGrade::C,
            51..=65 => LetterGrade::D,
            66..=80 => LetterGrade::E,
            _ => LetterGrade::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LetterGrade::A => "A",
            LetterGrade::B => "B",
            LetterGrade::C => "C",
            LetterGrade::D => "D",
            LetterGrade::E => "E",
            LetterGrade::F => "F",
        }
    }
}

impl std::str::FromStr for LetterGrade {
    type Err = crate::error::HelixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(LetterGrade::A),
            "B" => Ok(LetterGrade::B),
            "C" => Ok(LetterGrade::C),
            "D" => Ok(LetterGrade::D),
            "E" => Ok(LetterGrade::E),
            "F" => Ok(LetterGrade::F),
            other => Err(crate::error::HelixError::Validation(format!(
                "unknown letter grade '{other}'"
            ))),
        }
    }
}

/// Decision flags derived from the blended score and the fraud
/// dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFlags {
    pub high_risk: bool,
    pub requires_manual_review: bool,
    pub fast_track_eligible: bool,
    pub prime_customer: bool,
}

/// Complete output of one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub helix_score: f64,
    pub confidence: f64,
    pub category: RiskCategory,
    pub letter_grade: LetterGrade,
    pub flags: RiskFlags,
    /// Always exactly five, in `Dimension::ALL` order.
    pub assessments: Vec<DimensionAssessment>,
    pub explanation: RiskExplanation,
}

impl ScoreReport {
    pub fn assessment(&self, dimension: Dimension) -> Option<&DimensionAssessment> {
        self.assessments.iter().find(|a| a.dimension == dimension)
    }

    pub fn dimension_score(&self, dimension: Dimension) -> f64 {
        self.assessment(dimension).map(|a| a.score).unwrap_or(50.0)
    }
}

/// The stateless composite engine. Explicitly constructed with its
/// configuration and shared by reference; holds no mutable state.
pub struct RiskScorer {
    config: ScoringConfig,
}

impl RiskScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a feature vector. Pure and deterministic.
    pub fn score(&self, vector: &FeatureVector) -> HelixResult<ScoreReport> {
        vector.validate()?;

        let assessments = vec![
            self.assess_financial(vector),
            self.assess_behavioral(vector),
            self.assess_alternative(vector),
            self.assess_environmental(vector),
            self.assess_fraud(vector),
        ];

        let w = &self.config.dimension_weights;
        let weights = [
            w.financial,
            w.behavioral,
            w.alternative,
            w.environmental,
            w.fraud,
        ];

        let helix_score: f64 = assessments
            .iter()
            .zip(weights)
            .map(|(a, weight)| a.score * weight)
            .sum();
        let helix_score = clamp_score(helix_score);

        let confidence: f64 = assessments
            .iter()
            .zip(weights)
            .map(|(a, weight)| a.confidence * weight)
            .sum();
        let confidence = confidence.clamp(0.0, 1.0);

        let fraud_score = assessments
            .iter()
            .find(|a| a.dimension == Dimension::Fraud)
            .map(|a| a.score)
            .unwrap_or(50.0);

        let t = &self.config.flag_thresholds;
        let flags = RiskFlags {
            high_risk: helix_score >= t.high_risk_min,
            requires_manual_review: helix_score >= t.manual_review_min
                || fraud_score >= t.manual_review_fraud_min,
            fast_track_eligible: helix_score <= t.fast_track_max
                && fraud_score <= t.fast_track_fraud_max,
            prime_customer: helix_score <= t.prime_max,
        };

        let category = RiskCategory::from_score(helix_score);
        let explanation = explanation::synthesize(helix_score, category, &assessments);

        Ok(ScoreReport {
            helix_score,
            confidence,
            category,
            letter_grade: LetterGrade::from_score(helix_score),
            flags,
            assessments,
            explanation,
        })
    }

    // ── Financial stability ────────────────────────────────────

    fn assess_financial(&self, v: &FeatureVector) -> DimensionAssessment {
        let mut factors = Vec::new();

        let income = income_consistency_score(v);
        match v.monthly_income {
            Some(m) => factors.push(format!("Documented monthly income of ${m:.0}")),
            None => factors.push("No income documentation on file".to_string()),
        }
        if let Some(cv) = v.monthly_income_variance {
            factors.push(format!(
                "Income varies {:.1}% between pay periods",
                cv * 100.0
            ));
        }
        if let Some(months) = v.employment_duration_months {
            factors.push(format!("Employment tenure of {months:.0} months"));
        }

        let cash_flow = cash_flow_health_score(v);
        if let Some(balance) = v.average_monthly_balance {
            factors.push(format!("Average monthly balance of ${balance:.0}"));
        }
        if let Some(overdrafts) = v.overdraft_frequency {
            if overdrafts > 0.0 {
                factors.push(format!("{overdrafts:.0} overdraft events on record"));
            }
        }
        if let Some(rate) = v.savings_rate {
            factors.push(format!("Savings rate of {rate:.1}%"));
        }

        let debt = debt_management_score(v);
        if let Some(dti) = v.debt_to_income_ratio {
            if dti > 0.43 {
                factors.push(format!(
                    "Debt-to-income ratio of {dti:.2} exceeds the 0.43 stress threshold"
                ));
            } else {
                factors.push(format!("Debt-to-income ratio of {dti:.2}"));
            }
        }
        if let Some(util) = v.credit_utilization {
            if util > 30.0 {
                factors.push(format!("Credit utilization at {util:.0}%"));
            }
        }

        let w = &self.config.financial_weights;
        let goodness = income * w.income_consistency
            + cash_flow * w.cash_flow_health
            + debt * w.debt_management;

        let present = [
            v.monthly_income.is_some(),
            v.monthly_income_variance.is_some(),
            v.average_monthly_balance.is_some(),
            v.savings_rate.is_some(),
            v.debt_to_income_ratio.is_some(),
        ];
        DimensionAssessment {
            dimension: Dimension::Financial,
            score: clamp_score(100.0 - goodness),
            confidence: field_confidence(&present, 5),
            factors,
        }
    }

    // ── Behavioral ─────────────────────────────────────────────

    fn assess_behavioral(&self, v: &FeatureVector) -> DimensionAssessment {
        let mut factors = Vec::new();

        let spending = spending_patterns_score(v);
        if let Some(r) = v.discretionary_spending_ratio {
            factors.push(format!(
                "Discretionary spending at {:.0}% of outflows",
                r * 100.0
            ));
        }

        let responsibility = financial_responsibility_score(v);
        if let Some(c) = v.bill_payment_consistency {
            factors.push(format!("Bill payment consistency of {c:.0}/100"));
        }
        if v.bill_payment_consistency.is_none()
            && v.rent_payment_history.is_none()
            && v.utility_payment_patterns.is_none()
        {
            factors.push("No recurring payment history available".to_string());
        }

        let digital = digital_behavior_score(v);
        if let Some(d) = v.digital_banking_engagement {
            factors.push(format!("Digital banking engagement of {d:.0}/100"));
        }

        let w = &self.config.behavioral_weights;
        let goodness = spending * w.spending_patterns
            + responsibility * w.financial_responsibility
            + digital * w.digital_behavior;

        let present = [
            v.discretionary_spending_ratio.is_some(),
            v.bill_payment_consistency.is_some(),
            v.rent_payment_history.is_some(),
            v.utility_payment_patterns.is_some(),
        ];
        DimensionAssessment {
            dimension: Dimension::Behavioral,
            score: clamp_score(100.0 - goodness),
            confidence: field_confidence(&present, 4),
            factors,
        }
    }

    // ── Alternative / asset ────────────────────────────────────

    fn assess_alternative(&self, v: &FeatureVector) -> DimensionAssessment {
        let mut factors = Vec::new();

        let social = social_capital_score(v);
        if let Some(c) = v.community_standing {
            factors.push(format!("Community standing of {c:.0}/100"));
        }

        let asset = asset_profile_score(v);
        if v.property_ownership == Some(true) {
            factors.push("Owns residential property".to_string());
        }
        if v.vehicle_ownership == Some(true) {
            factors.push("Owns a vehicle".to_string());
        }
        if v.business_ownership == Some(true) {
            factors.push("Owns a business".to_string());
        }
        if let Some(n) = v.investment_account_count {
            if n > 0 {
                factors.push(format!("{n} investment account(s) held"));
            }
        }

        let lifestyle = lifestyle_stability_score(v);
        if let Some(months) = v.residential_stability_months {
            factors.push(format!("{months:.0} months at current residence"));
        }
        if factors.is_empty() {
            factors.push("No alternative data signals available".to_string());
        }

        let w = &self.config.alternative_weights;
        let goodness = social * w.social_capital
            + asset * w.asset_profile
            + lifestyle * w.lifestyle_stability;

        let present = [
            v.property_ownership.is_some(),
            v.investment_account_count.is_some(),
            v.residential_stability_months.is_some(),
            v.community_standing.is_some(),
        ];
        DimensionAssessment {
            dimension: Dimension::Alternative,
            score: clamp_score(100.0 - goodness),
            confidence: field_confidence(&present, 4),
            factors,
        }
    }

    // ── Environmental ──────────────────────────────────────────

    fn assess_environmental(&self, v: &FeatureVector) -> DimensionAssessment {
        let mut factors = Vec::new();

        let goodness = environmental_score(v);
        match v.regional_economic_health {
            Some(macro_health) => factors.push(format!(
                "Regional economic health index at {macro_health:.0}/100"
            )),
            None => factors.push("Neutral macroeconomic baseline assumed".to_string()),
        }

        // Regulatory sub-factor reserved, unused. Confidence is fixed:
        // macro conditions are observed, not derived from the subject.
        DimensionAssessment {
            dimension: Dimension::Environmental,
            score: clamp_score(100.0 - goodness),
            confidence: 0.8,
            factors,
        }
    }

    // ── Fraud / identity ───────────────────────────────────────

    fn assess_fraud(&self, v: &FeatureVector) -> DimensionAssessment {
        let mut factors = Vec::new();

        let identity = identity_verification_score(v);
        if let Some(auth) = v.document_authenticity {
            factors.push(format!("Document authenticity of {auth:.0}/100"));
        }
        if v.address_verification == Some(false) {
            factors.push("Address could not be verified".to_string());
        }
        if let Some(months) = v.phone_number_stability {
            if months < 6.0 {
                factors.push(format!("Phone number only {months:.0} months old"));
            }
        }

        let anomaly = transaction_anomaly_score(v);
        if let Some(s) = v.unusual_transfer_activity {
            if s > 0.0 {
                factors.push(format!("Unusual transfer activity signal at {s:.0}/100"));
            }
        }
        if let Some(s) = v.transaction_velocity_risk {
            if s > 0.0 {
                factors.push(format!("Transaction velocity signal at {s:.0}/100"));
            }
        }
        if let Some(s) = v.geolocation_risk {
            if s > 0.0 {
                factors.push(format!("Geolocation risk signal at {s:.0}/100"));
            }
        }

        let w = &self.config.fraud_weights;
        let goodness =
            identity * w.identity_verification + anomaly * w.transaction_anomaly;

        let present = [
            v.document_authenticity.is_some(),
            v.biometric_match.is_some(),
            v.address_verification.is_some(),
            v.phone_number_stability.is_some(),
        ];
        DimensionAssessment {
            dimension: Dimension::Fraud,
            score: clamp_score(100.0 - goodness),
            confidence: field_confidence(&present, 4),
            factors,
        }
    }
}

// ── Sub-factor formulas ──────────────────────────────────────────────
//
// Exposed so tests can pin exact numeric outputs. All return goodness
// scores in [0,100], clamped after every additive adjustment.

pub fn income_consistency_score(v: &FeatureVector) -> f64 {
    let mut s = 50.0;
    if let Some(months) = v.employment_duration_months {
        s = (months / 24.0 * 100.0).min(100.0);
    }
    s = clamp_score(s);
    if let Some(variance) = v.monthly_income_variance {
        s -= (variance * 10.0).min(50.0) * 0.2;
    }
    clamp_score(s)
}

pub fn cash_flow_health_score(v: &FeatureVector) -> f64 {
    let mut s = match (v.average_monthly_balance, v.monthly_income) {
        (Some(balance), Some(income)) if income > 0.0 => {
            ((balance / income) * 200.0).min(100.0)
        }
        _ => 50.0,
    };
    s = clamp_score(s);
    if let Some(overdrafts) = v.overdraft_frequency {
        s -= (overdrafts * 5.0).min(30.0);
        s = clamp_score(s);
    }
    if let Some(rate) = v.savings_rate {
        if rate >= 20.0 {
            s += 10.0;
        } else if rate >= 10.0 {
            s += 5.0;
        } else if rate < 0.0 {
            s -= 10.0;
        }
        s = clamp_score(s);
    }
    s
}

pub fn debt_management_score(v: &FeatureVector) -> f64 {
    let dti_score = match v.debt_to_income_ratio {
        Some(dti) if dti <= 0.36 => 100.0 - dti * 100.0,
        Some(dti) if dti <= 0.43 => 70.0 - (dti - 0.36) * 500.0,
        Some(dti) => (50.0 - (dti - 0.43) * 500.0).max(0.0),
        None => 50.0,
    };
    let mut s = match v.payment_timeliness {
        Some(timeliness) => (dti_score + timeliness) / 2.0,
        None => dti_score,
    };
    s = clamp_score(s);
    if let Some(util) = v.credit_utilization {
        s -= ((util - 30.0) * 0.5).max(0.0);
    }
    clamp_score(s)
}

pub fn spending_patterns_score(v: &FeatureVector) -> f64 {
    let s = match v.discretionary_spending_ratio {
        Some(r) if r <= 0.3 => 100.0,
        Some(r) if r <= 0.5 => 80.0 - (r - 0.3) * 100.0,
        Some(r) => (60.0 - (r - 0.5) * 120.0).max(0.0),
        None => 50.0,
    };
    clamp_score(s)
}

pub fn financial_responsibility_score(v: &FeatureVector) -> f64 {
    let signals: Vec<f64> = [
        v.bill_payment_consistency,
        v.rent_payment_history,
        v.utility_payment_patterns,
    ]
    .into_iter()
    .flatten()
    .collect();
    if signals.is_empty() {
        50.0
    } else {
        clamp_score(signals.iter().sum::<f64>() / signals.len() as f64)
    }
}

pub fn digital_behavior_score(v: &FeatureVector) -> f64 {
    clamp_score(v.digital_banking_engagement.unwrap_or(50.0))
}

pub fn social_capital_score(v: &FeatureVector) -> f64 {
    clamp_score(v.community_standing.unwrap_or(50.0))
}

pub fn asset_profile_score(v: &FeatureVector) -> f64 {
    let any_present = v.property_ownership.is_some()
        || v.vehicle_ownership.is_some()
        || v.business_ownership.is_some()
        || v.investment_account_count.is_some();
    if !any_present {
        return 50.0;
    }

    let mut s = 30.0;
    if v.property_ownership == Some(true) {
        s += 25.0;
        s = clamp_score(s);
    }
    if v.vehicle_ownership == Some(true) {
        s += 15.0;
        s = clamp_score(s);
    }
    if v.business_ownership == Some(true) {
        s += 20.0;
        s = clamp_score(s);
    }
    if let Some(n) = v.investment_account_count {
        s += (n as f64 * 5.0).min(20.0);
        s = clamp_score(s);
    }
    s
}

pub fn lifestyle_stability_score(v: &FeatureVector) -> f64 {
    match v.residential_stability_months {
        Some(months) => clamp_score((months / 24.0 * 100.0).min(100.0)),
        None => 50.0,
    }
}

pub fn environmental_score(v: &FeatureVector) -> f64 {
    let macro_health = v.regional_economic_health.unwrap_or(50.0);
    clamp_score(macro_health * 0.4 + 50.0 * 0.6)
}

pub fn identity_verification_score(v: &FeatureVector) -> f64 {
    let signals: Vec<f64> = [v.document_authenticity, v.biometric_match]
        .into_iter()
        .flatten()
        .collect();
    let mut s = if signals.is_empty() {
        50.0
    } else {
        signals.iter().sum::<f64>() / signals.len() as f64
    };
    s = clamp_score(s);
    if v.address_verification == Some(false) {
        s -= 20.0;
        s = clamp_score(s);
    }
    if let Some(months) = v.phone_number_stability {
        if months < 6.0 {
            s -= 10.0;
            s = clamp_score(s);
        }
    }
    s
}

pub fn transaction_anomaly_score(v: &FeatureVector) -> f64 {
    let mut s = 100.0;
    for signal in [
        v.unusual_transfer_activity,
        v.transaction_velocity_risk,
        v.geolocation_risk,
    ]
    .into_iter()
    .flatten()
    {
        s -= signal / 3.0;
        s = clamp_score(s);
    }
    s
}

fn field_confidence(present: &[bool], denominator: usize) -> f64 {
    let count = present.iter().filter(|p| **p).count();
    (count as f64 / denominator as f64).min(1.0)
}

fn clamp_score(s: f64) -> f64 {
    s.clamp(0.0, 100.0)
}
