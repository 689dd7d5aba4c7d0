//! Scoring configuration.
//!
//! RULE: Every weight, threshold, and keyword the pipeline uses lives
//! here as an explicit immutable value. Assessors and the orchestrator
//! receive a `ScoringConfig` by reference — there are no hidden
//! module-level constants, so tests can override any knob.

use serde::{Deserialize, Serialize};

/// Blend weights for the five risk dimensions. Must sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionWeights {
    pub financial: f64,
    pub behavioral: f64,
    pub alternative: f64,
    pub environmental: f64,
    pub fraud: f64,
}

impl DimensionWeights {
    pub fn sum(&self) -> f64 {
        self.financial + self.behavioral + self.alternative + self.environmental + self.fraud
    }
}

/// Sub-factor weights inside the financial stability dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialWeights {
    pub income_consistency: f64,
    pub cash_flow_health: f64,
    pub debt_management: f64,
}

/// Sub-factor weights inside the behavioral dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralWeights {
    pub spending_patterns: f64,
    pub financial_responsibility: f64,
    pub digital_behavior: f64,
}

/// Sub-factor weights inside the alternative/asset dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeWeights {
    pub social_capital: f64,
    pub asset_profile: f64,
    pub lifestyle_stability: f64,
}

/// Sub-factor weights inside the fraud/identity dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudWeights {
    pub identity_verification: f64,
    pub transaction_anomaly: f64,
}

/// Score thresholds that drive the decision flags on a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlagThresholds {
    pub high_risk_min: f64,
    pub manual_review_min: f64,
    pub manual_review_fraud_min: f64,
    pub fast_track_max: f64,
    pub fast_track_fraud_max: f64,
    pub prime_max: f64,
}

/// Thresholds for the continuous-monitoring rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringThresholds {
    /// Minimum score delta before a score_increase alert fires.
    pub score_delta_alert: f64,
    /// Delta above which the alert escalates to high severity and
    /// requires intervention.
    pub score_delta_intervention: f64,
    /// Income coefficient of variation above which income_drop fires.
    pub income_variance_alert: f64,
    /// Payment timeliness below which payment_issues fires.
    pub payment_timeliness_alert: f64,
    /// Payment timeliness below which the alert is critical.
    pub payment_timeliness_critical: f64,
    /// Current score at or above which intervention is always required.
    pub intervention_score_min: f64,
}

/// Fallback values the aggregator applies when a signal is not
/// derivable from any document on file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalDefaults {
    pub document_authenticity: f64,
    pub address_verification: bool,
    pub phone_number_stability_months: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub dimension_weights: DimensionWeights,
    pub financial_weights: FinancialWeights,
    pub behavioral_weights: BehavioralWeights,
    pub alternative_weights: AlternativeWeights,
    pub fraud_weights: FraudWeights,
    pub flag_thresholds: FlagThresholds,
    pub monitoring: MonitoringThresholds,
    pub defaults: SignalDefaults,

    /// Tokens that mark a transaction description as a debt payment
    /// (case-insensitive substring match).
    pub debt_keywords: Vec<String>,
    /// Tokens that mark a transaction as a recurring debt/bill payment
    /// for the payment-timeliness interval analysis.
    pub bill_keywords: Vec<String>,

    /// Gross pay multiplier when a pay stub carries no explicit pay
    /// period (biweekly cadence assumption).
    pub biweekly_multiplier: f64,
    /// Relative disagreement above which a tax-return income figure
    /// supersedes the pay-stub average.
    pub tax_income_tolerance: f64,
    /// Absolute amount tolerance when clustering recurring debt
    /// payments (currency units).
    pub debt_amount_tolerance: f64,
    /// Occurrences required before an amount cluster counts as a
    /// recurring monthly obligation.
    pub debt_recurrence_min: usize,

    /// Bounded retry for transient store failures in the orchestrator.
    pub max_store_retries: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            dimension_weights: DimensionWeights {
                financial: 0.35,
                behavioral: 0.25,
                alternative: 0.20,
                environmental: 0.10,
                fraud: 0.10,
            },
            financial_weights: FinancialWeights {
                income_consistency: 0.40,
                cash_flow_health: 0.35,
                debt_management: 0.25,
            },
            behavioral_weights: BehavioralWeights {
                spending_patterns: 0.35,
                financial_responsibility: 0.40,
                digital_behavior: 0.25,
            },
            alternative_weights: AlternativeWeights {
                social_capital: 0.30,
                asset_profile: 0.40,
                lifestyle_stability: 0.30,
            },
            fraud_weights: FraudWeights {
                identity_verification: 0.50,
                transaction_anomaly: 0.50,
            },
            flag_thresholds: FlagThresholds {
                high_risk_min: 66.0,
                manual_review_min: 45.0,
                manual_review_fraud_min: 70.0,
                fast_track_max: 30.0,
                fast_track_fraud_max: 20.0,
                prime_max: 25.0,
            },
            monitoring: MonitoringThresholds {
                score_delta_alert: 10.0,
                score_delta_intervention: 20.0,
                income_variance_alert: 0.2,
                payment_timeliness_alert: 70.0,
                payment_timeliness_critical: 50.0,
                intervention_score_min: 66.0,
            },
            defaults: SignalDefaults {
                document_authenticity: 90.0,
                address_verification: true,
                phone_number_stability_months: 12.0,
            },
            debt_keywords: [
                "loan",
                "credit",
                "mortgage",
                "car payment",
                "auto loan",
                "student loan",
                "personal loan",
                "debt",
                "minimum payment",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            bill_keywords: [
                "loan",
                "credit",
                "mortgage",
                "rent",
                "utility",
                "electric",
                "water",
                "insurance",
                "phone",
                "internet",
                "bill",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            biweekly_multiplier: 2.17,
            tax_income_tolerance: 0.20,
            debt_amount_tolerance: 1.0,
            debt_recurrence_min: 2,
            max_store_retries: 3,
        }
    }
}

impl ScoringConfig {
    /// Load from a JSON file. Production deployments pin the config in
    /// version control; tests use `ScoringConfig::default()`.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ScoringConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would break the scoring invariants.
    pub fn validate(&self) -> anyhow::Result<()> {
        let sum = self.dimension_weights.sum();
        if (sum - 1.0).abs() > 1e-9 {
            anyhow::bail!("dimension weights must sum to 1.0, got {sum}");
        }
        if self.biweekly_multiplier <= 0.0 {
            anyhow::bail!("biweekly_multiplier must be positive");
        }
        if self.debt_recurrence_min == 0 {
            anyhow::bail!("debt_recurrence_min must be at least 1");
        }
        Ok(())
    }
}
