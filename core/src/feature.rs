//! The canonical subject-level feature vector.
//!
//! Every field is optional with an explicit presence flag (`Option`),
//! so downstream code never has to disambiguate "missing" from "zero".
//! The vector is produced fresh on every aggregation call and consumed
//! immediately by the scorer (or embedded in a profile snapshot) —
//! it is never held as mutable state.

use crate::error::{HelixError, HelixResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    // ── Financial stability ────────────────────────────────────
    pub monthly_income: Option<f64>,
    /// Coefficient of variation of pay-stub incomes (stdev / mean).
    pub monthly_income_variance: Option<f64>,
    pub employment_duration_months: Option<f64>,
    pub average_monthly_balance: Option<f64>,
    pub overdraft_frequency: Option<f64>,
    pub savings_rate: Option<f64>,
    /// Months of expenses covered by the average balance.
    pub emergency_fund_coverage: Option<f64>,
    pub monthly_debt_payments: Option<f64>,
    pub debt_to_income_ratio: Option<f64>,
    pub credit_utilization: Option<f64>,
    pub multiple_income_streams: Option<u32>,

    // ── Behavioral ─────────────────────────────────────────────
    pub payment_timeliness: Option<f64>,
    pub bill_payment_consistency: Option<f64>,
    pub rent_payment_history: Option<f64>,
    pub utility_payment_patterns: Option<f64>,
    pub discretionary_spending_ratio: Option<f64>,
    pub digital_banking_engagement: Option<f64>,

    // ── Alternative / asset ────────────────────────────────────
    pub property_ownership: Option<bool>,
    pub vehicle_ownership: Option<bool>,
    pub business_ownership: Option<bool>,
    pub investment_account_count: Option<u32>,
    pub residential_stability_months: Option<f64>,
    pub community_standing: Option<f64>,

    // ── Environmental ──────────────────────────────────────────
    pub regional_economic_health: Option<f64>,

    // ── Fraud / identity ───────────────────────────────────────
    pub document_authenticity: Option<f64>,
    pub address_verification: Option<bool>,
    pub phone_number_stability: Option<f64>,
    pub biometric_match: Option<f64>,
    pub unusual_transfer_activity: Option<f64>,
    pub transaction_velocity_risk: Option<f64>,
    pub geolocation_risk: Option<f64>,

    // ── Derived ────────────────────────────────────────────────
    /// Percentage of the core underwriting fields that are populated.
    pub profile_completeness: f64,
}

impl FeatureVector {
    /// Structural sanity check applied at the scoring boundary. The
    /// aggregator clamps its own arithmetic, so in practice this only
    /// rejects vectors assembled by hand from bad upstream data.
    pub fn validate(&self) -> HelixResult<()> {
        let non_negative = [
            ("monthly_income", self.monthly_income),
            ("monthly_income_variance", self.monthly_income_variance),
            ("employment_duration_months", self.employment_duration_months),
            ("overdraft_frequency", self.overdraft_frequency),
            ("emergency_fund_coverage", self.emergency_fund_coverage),
            ("monthly_debt_payments", self.monthly_debt_payments),
            ("debt_to_income_ratio", self.debt_to_income_ratio),
            ("credit_utilization", self.credit_utilization),
            ("phone_number_stability", self.phone_number_stability),
            ("residential_stability_months", self.residential_stability_months),
        ];
        for (name, value) in non_negative {
            if let Some(v) = value {
                if v.is_nan() {
                    return Err(HelixError::Validation(format!("{name} is NaN")));
                }
                if v < 0.0 {
                    return Err(HelixError::Validation(format!("{name} is negative ({v})")));
                }
            }
        }

        let bounded = [
            ("payment_timeliness", self.payment_timeliness),
            ("bill_payment_consistency", self.bill_payment_consistency),
            ("rent_payment_history", self.rent_payment_history),
            ("utility_payment_patterns", self.utility_payment_patterns),
            ("digital_banking_engagement", self.digital_banking_engagement),
            ("community_standing", self.community_standing),
            ("regional_economic_health", self.regional_economic_health),
            ("document_authenticity", self.document_authenticity),
            ("biometric_match", self.biometric_match),
            ("unusual_transfer_activity", self.unusual_transfer_activity),
            ("transaction_velocity_risk", self.transaction_velocity_risk),
            ("geolocation_risk", self.geolocation_risk),
        ];
        for (name, value) in bounded {
            if let Some(v) = value {
                if v.is_nan() || !(0.0..=100.0).contains(&v) {
                    return Err(HelixError::Validation(format!(
                        "{name} out of [0,100] range ({v})"
                    )));
                }
            }
        }

        Ok(())
    }
}
