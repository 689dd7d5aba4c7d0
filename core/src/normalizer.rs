//! Document Metric Normalizer.
//!
//! Converts one document's extracted field dictionary into typed
//! per-document metrics. Missing optional fields never fail a
//! document; only a structurally absent required input does
//! (`HelixError::Extraction`), and that failure is scoped to the one
//! document.

use crate::{
    config::ScoringConfig,
    document::{DocumentKind, DocumentMetrics, ExtractedFields, Transaction},
    error::{HelixError, HelixResult},
};
use chrono::{Datelike, NaiveDate};

/// Normalize one document. The entry point used by the orchestrator.
pub fn normalize(
    document_id: &str,
    kind: DocumentKind,
    fields: &ExtractedFields,
    config: &ScoringConfig,
) -> HelixResult<DocumentMetrics> {
    if fields.is_empty() {
        return Err(HelixError::Extraction {
            document_id: document_id.to_string(),
            reason: "extraction produced no fields (unreadable source)".to_string(),
        });
    }

    match kind {
        DocumentKind::BankStatement => normalize_bank_statement(document_id, fields, config),
        DocumentKind::PayStub => normalize_pay_stub(document_id, fields, config),
        DocumentKind::TaxReturn => normalize_tax_return(document_id, fields),
        DocumentKind::CreditCardStatement
        | DocumentKind::LoanStatement
        | DocumentKind::DebtStatement
        | DocumentKind::Bill => Ok(normalize_account_statement(fields)),
    }
}

// ── Bank statement ───────────────────────────────────────────────────

fn normalize_bank_statement(
    document_id: &str,
    fields: &ExtractedFields,
    config: &ScoringConfig,
) -> HelixResult<DocumentMetrics> {
    let Some(raw) = fields.transactions.as_ref() else {
        return Err(HelixError::Extraction {
            document_id: document_id.to_string(),
            reason: "bank statement carries no transaction list".to_string(),
        });
    };

    // Chronological order; same-day transactions keep extraction order.
    let mut txns: Vec<Transaction> = raw.clone();
    txns.sort_by_key(|t| t.date);

    let opening = fields.opening_balance.unwrap_or(0.0);

    let mut metrics = DocumentMetrics {
        average_monthly_balance: average_monthly_balance(&txns, opening),
        overdraft_frequency: Some(overdraft_frequency(&txns, opening)),
        payment_timeliness: Some(payment_timeliness(&txns, &config.bill_keywords)),
        savings_rate: Some(savings_rate(&txns)),
        ..DocumentMetrics::default()
    };
    metrics.transactions = txns;
    Ok(metrics)
}

/// Mean, over the calendar months present in the statement, of the
/// day-weighted running balance within each month. Each
/// post-transaction balance persists until the next transaction in the
/// same month, or through the end of the month (inclusive).
fn average_monthly_balance(txns: &[Transaction], opening: f64) -> Option<f64> {
    if txns.is_empty() {
        return None;
    }

    let mut month_averages: Vec<f64> = Vec::new();
    let mut running = opening;
    let mut i = 0;

    while i < txns.len() {
        let month = (txns[i].date.year(), txns[i].date.month());
        let mut weighted_sum = 0.0;
        let mut total_days = 0.0;

        let mut j = i;
        while j < txns.len() && (txns[j].date.year(), txns[j].date.month()) == month {
            running += txns[j].amount;

            let days = if j + 1 < txns.len()
                && (txns[j + 1].date.year(), txns[j + 1].date.month()) == month
            {
                (txns[j + 1].date - txns[j].date).num_days() as f64
            } else {
                (last_day_of_month(txns[j].date) - txns[j].date).num_days() as f64 + 1.0
            };

            weighted_sum += running * days;
            total_days += days;
            j += 1;
        }

        if total_days > 0.0 {
            month_averages.push(weighted_sum / total_days);
        }
        i = j;
    }

    if month_averages.is_empty() {
        None
    } else {
        Some(month_averages.iter().sum::<f64>() / month_averages.len() as f64)
    }
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (next_y, next_m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    // The first of the following month always exists.
    NaiveDate::from_ymd_opt(next_y, next_m, 1)
        .unwrap_or(date)
        .pred_opt()
        .unwrap_or(date)
}

/// Count of transactions after which the running balance is negative.
fn overdraft_frequency(txns: &[Transaction], opening: f64) -> u32 {
    let mut running = opening;
    let mut count = 0u32;
    for t in txns {
        running += t.amount;
        if running < 0.0 {
            count += 1;
        }
    }
    count
}

/// Regularity of intervals between recognized debt/bill payments,
/// expressed as 100 − cv·100 and clamped to [0,100]. With fewer than
/// two qualifying payments there is no interval to measure and the
/// score defaults to the neutral 50.
fn payment_timeliness(txns: &[Transaction], lexicon: &[String]) -> f64 {
    let dates: Vec<NaiveDate> = txns
        .iter()
        .filter(|t| matches_lexicon(&t.description, lexicon))
        .map(|t| t.date)
        .collect();

    let intervals: Vec<f64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect();
    if intervals.is_empty() {
        return 50.0;
    }

    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    if mean <= 0.0 {
        return 50.0;
    }
    let variance =
        intervals.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / intervals.len() as f64;
    let cv = variance.sqrt() / mean;

    (100.0 - cv * 100.0).clamp(0.0, 100.0)
}

/// (deposits − withdrawals) / deposits · 100; zero when the statement
/// shows no deposits at all.
fn savings_rate(txns: &[Transaction]) -> f64 {
    let deposits: f64 = txns.iter().filter(|t| t.amount > 0.0).map(|t| t.amount).sum();
    let withdrawals: f64 = txns
        .iter()
        .filter(|t| t.amount < 0.0)
        .map(|t| t.amount.abs())
        .sum();

    if deposits <= 0.0 {
        0.0
    } else {
        (deposits - withdrawals) / deposits * 100.0
    }
}

pub(crate) fn matches_lexicon(description: &str, lexicon: &[String]) -> bool {
    let lower = description.to_lowercase();
    lexicon.iter().any(|k| lower.contains(k.as_str()))
}

// ── Pay stub ─────────────────────────────────────────────────────────

fn normalize_pay_stub(
    document_id: &str,
    fields: &ExtractedFields,
    config: &ScoringConfig,
) -> HelixResult<DocumentMetrics> {
    let Some(gross) = fields.gross_pay else {
        return Err(HelixError::Extraction {
            document_id: document_id.to_string(),
            reason: "pay stub carries no gross pay figure".to_string(),
        });
    };

    // An explicit pay period means the stated figure already covers a
    // known span; without one we assume biweekly pay.
    let monthly_income = if fields.pay_period_start.is_some() && fields.pay_period_end.is_some() {
        gross
    } else {
        gross * config.biweekly_multiplier
    };

    Ok(DocumentMetrics {
        monthly_income: Some(monthly_income),
        employer_name: fields.employer_name.clone(),
        pay_period_start: fields.pay_period_start,
        pay_period_end: fields.pay_period_end,
        ..DocumentMetrics::default()
    })
}

// ── Tax return ───────────────────────────────────────────────────────

fn normalize_tax_return(document_id: &str, fields: &ExtractedFields) -> HelixResult<DocumentMetrics> {
    let annual = match fields.adjusted_gross_income.or(fields.total_income) {
        Some(v) => v,
        None => {
            return Err(HelixError::Extraction {
                document_id: document_id.to_string(),
                reason: "tax return carries neither AGI nor total income".to_string(),
            })
        }
    };

    Ok(DocumentMetrics {
        monthly_income: Some(annual / 12.0),
        ..DocumentMetrics::default()
    })
}

// ── Credit card / loan / debt / bill ─────────────────────────────────

/// Account-style documents pass their scalar fields through untouched;
/// reconciliation happens at aggregation time.
fn normalize_account_statement(fields: &ExtractedFields) -> DocumentMetrics {
    let mut metrics = DocumentMetrics {
        balance: fields.balance,
        credit_limit: fields.credit_limit,
        minimum_payment: fields.minimum_payment,
        due_date: fields.due_date,
        payment_status: fields.payment_status.clone(),
        ..DocumentMetrics::default()
    };
    if let Some(txns) = fields.transactions.as_ref() {
        let mut sorted = txns.clone();
        sorted.sort_by_key(|t| t.date);
        metrics.transactions = sorted;
    }
    metrics
}
