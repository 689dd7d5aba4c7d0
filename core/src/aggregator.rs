//! Feature Aggregator.
//!
//! Reconciles every normalized document of one subject into the
//! canonical feature vector.
//!
//! RULE: aggregation is a pure function of the unordered document set.
//! Documents are re-sorted by id before any floating-point reduction,
//! so two calls over the same set — in any input order — produce
//! byte-identical vectors.

use crate::{
    config::ScoringConfig,
    document::{DocumentKind, DocumentMetrics, NormalizedDocument, Transaction},
    feature::FeatureVector,
    normalizer,
};
use std::collections::BTreeSet;

pub struct FeatureAggregator<'a> {
    config: &'a ScoringConfig,
}

impl<'a> FeatureAggregator<'a> {
    pub fn new(config: &'a ScoringConfig) -> Self {
        Self { config }
    }

    /// Build the feature vector from a subject's full document set.
    /// Failed documents and documents without metrics are skipped —
    /// one bad upload never poisons the rest of the history.
    pub fn aggregate(&self, documents: &[NormalizedDocument]) -> FeatureVector {
        // Canonical order: by document id. Input order must not leak
        // into any floating-point sum.
        let mut docs: Vec<&NormalizedDocument> = documents
            .iter()
            .filter(|d| d.metrics.is_some())
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));

        let mut vector = FeatureVector::default();

        self.aggregate_income(&mut vector, &docs);
        self.aggregate_cash_flow(&mut vector, &docs);
        self.aggregate_payment_behavior(&mut vector, &docs);
        self.aggregate_debt(&mut vector, &docs);
        self.aggregate_credit_utilization(&mut vector, &docs);
        self.apply_defaults(&mut vector);

        vector.profile_completeness = profile_completeness(&vector);
        vector
    }

    fn aggregate_income(&self, vector: &mut FeatureVector, docs: &[&NormalizedDocument]) {
        let stub_incomes =
            collect_metric(docs, Some(DocumentKind::PayStub), |m| m.monthly_income);

        let stub_average = mean(&stub_incomes);
        if let Some(avg) = stub_average {
            vector.monthly_income = Some(avg);
            if stub_incomes.len() >= 2 {
                vector.monthly_income_variance = coefficient_of_variation(&stub_incomes);
            }
        }

        // A tax return is the more authoritative source: it supersedes
        // the stub average when the two disagree by more than the
        // configured relative tolerance.
        let tax_incomes =
            collect_metric(docs, Some(DocumentKind::TaxReturn), |m| m.monthly_income);
        if let Some(tax) = mean(&tax_incomes) {
            match stub_average {
                Some(avg) if avg > 0.0 => {
                    if ((tax - avg) / avg).abs() > self.config.tax_income_tolerance {
                        vector.monthly_income = Some(tax);
                    }
                }
                _ => vector.monthly_income = Some(tax),
            }
        }

        let employers: BTreeSet<&str> = docs
            .iter()
            .filter_map(|d| d.metrics.as_ref())
            .filter_map(|m| m.employer_name.as_deref())
            .collect();
        if !employers.is_empty() {
            vector.multiple_income_streams = Some(employers.len() as u32);
        }
    }

    fn aggregate_cash_flow(&self, vector: &mut FeatureVector, docs: &[&NormalizedDocument]) {
        let bank = Some(DocumentKind::BankStatement);
        let balances = collect_metric(docs, bank, |m| m.average_monthly_balance);
        let overdrafts = collect_metric(docs, bank, |m| m.overdraft_frequency.map(|n| n as f64));
        let savings = collect_metric(docs, bank, |m| m.savings_rate);

        vector.average_monthly_balance = mean(&balances);
        vector.overdraft_frequency = mean(&overdrafts);
        vector.savings_rate = mean(&savings);

        if let (Some(balance), Some(income)) =
            (vector.average_monthly_balance, vector.monthly_income)
        {
            if income > 0.0 {
                // Months of runway, assuming expenses run at 70% of income.
                vector.emergency_fund_coverage = Some((balance / (income * 0.7)).max(0.0));
            }
        }
    }

    fn aggregate_payment_behavior(&self, vector: &mut FeatureVector, docs: &[&NormalizedDocument]) {
        let timeliness = collect_metric(docs, None, |m| m.payment_timeliness);

        if let Some(avg) = mean(&timeliness) {
            vector.payment_timeliness = Some(avg);
            // No separate signals exist yet for bills, rent, and
            // utilities; they all surface the same scalar.
            vector.bill_payment_consistency = Some(avg);
            vector.rent_payment_history = Some(avg);
            vector.utility_payment_patterns = Some(avg);
        }
    }

    fn aggregate_debt(&self, vector: &mut FeatureVector, docs: &[&NormalizedDocument]) {
        let flagged: Vec<&Transaction> = docs
            .iter()
            .filter_map(|d| d.metrics.as_ref())
            .flat_map(|m| m.transactions.iter())
            .filter(|t| {
                t.amount < 0.0
                    && normalizer::matches_lexicon(&t.description, &self.config.debt_keywords)
            })
            .collect();

        let monthly = recurring_debt_total(
            &flagged,
            self.config.debt_amount_tolerance,
            self.config.debt_recurrence_min,
        );
        if monthly > 0.0 {
            vector.monthly_debt_payments = Some(monthly);
            if let Some(income) = vector.monthly_income {
                if income > 0.0 {
                    vector.debt_to_income_ratio = Some(monthly / income);
                }
            }
        }
    }

    fn aggregate_credit_utilization(
        &self,
        vector: &mut FeatureVector,
        docs: &[&NormalizedDocument],
    ) {
        let utilizations = collect_metric(docs, Some(DocumentKind::CreditCardStatement), |m| {
            match (m.balance, m.credit_limit) {
                (Some(balance), Some(limit)) if limit > 0.0 => {
                    Some((balance / limit * 100.0).max(0.0))
                }
                _ => None,
            }
        });
        vector.credit_utilization = mean(&utilizations);
    }

    fn apply_defaults(&self, vector: &mut FeatureVector) {
        let d = &self.config.defaults;
        if vector.document_authenticity.is_none() {
            vector.document_authenticity = Some(d.document_authenticity);
        }
        if vector.address_verification.is_none() {
            vector.address_verification = Some(d.address_verification);
        }
        if vector.phone_number_stability.is_none() {
            vector.phone_number_stability = Some(d.phone_number_stability_months);
        }
    }
}

/// Pull one metric out of every document of the given kind (or every
/// document when `kind` is None), in canonical order.
fn collect_metric(
    docs: &[&NormalizedDocument],
    kind: Option<DocumentKind>,
    select: impl Fn(&DocumentMetrics) -> Option<f64>,
) -> Vec<f64> {
    docs.iter()
        .filter(|d| kind.map_or(true, |k| d.kind == k))
        .filter_map(|d| d.metrics.as_ref())
        .filter_map(select)
        .collect()
}

/// Group flagged debt payments by absolute amount (within the given
/// tolerance of each cluster's first member, amounts pre-sorted) and
/// sum the mean amount of every cluster that recurs often enough to
/// look like a monthly obligation.
fn recurring_debt_total(flagged: &[&Transaction], tolerance: f64, min_occurrences: usize) -> f64 {
    let mut amounts: Vec<f64> = flagged.iter().map(|t| t.amount.abs()).collect();
    amounts.sort_by(|a, b| a.total_cmp(b));

    let mut total = 0.0;
    let mut i = 0;
    while i < amounts.len() {
        let anchor = amounts[i];
        let mut j = i;
        while j < amounts.len() && amounts[j] - anchor <= tolerance {
            j += 1;
        }
        let cluster = &amounts[i..j];
        if cluster.len() >= min_occurrences {
            total += cluster.iter().sum::<f64>() / cluster.len() as f64;
        }
        i = j;
    }
    total
}

/// Percentage of the core underwriting fields that are populated.
fn profile_completeness(vector: &FeatureVector) -> f64 {
    let fields = [
        vector.monthly_income.is_some(),
        vector.average_monthly_balance.is_some(),
        vector.payment_timeliness.is_some(),
        vector.debt_to_income_ratio.is_some(),
    ];
    let present = fields.iter().filter(|p| **p).count();
    present as f64 / fields.len() as f64 * 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation over mean.
fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m <= 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt() / m)
}
