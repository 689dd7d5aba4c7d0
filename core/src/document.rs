//! Document model — the contract between the extraction boundary, the
//! normalizer, and the document store.
//!
//! The core never sees raw bytes. Upstream extraction hands over an
//! `ExtractedFields` dictionary; the normalizer turns it into typed
//! `DocumentMetrics`; the store keeps both on the document row.

use crate::types::{DocumentId, SubjectId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The document classes the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    BankStatement,
    PayStub,
    TaxReturn,
    CreditCardStatement,
    LoanStatement,
    DebtStatement,
    Bill,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::BankStatement => "bank_statement",
            DocumentKind::PayStub => "pay_stub",
            DocumentKind::TaxReturn => "tax_return",
            DocumentKind::CreditCardStatement => "credit_card_statement",
            DocumentKind::LoanStatement => "loan_statement",
            DocumentKind::DebtStatement => "debt_statement",
            DocumentKind::Bill => "bill",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = crate::error::HelixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bank_statement" => Ok(DocumentKind::BankStatement),
            "pay_stub" => Ok(DocumentKind::PayStub),
            "tax_return" => Ok(DocumentKind::TaxReturn),
            "credit_card_statement" => Ok(DocumentKind::CreditCardStatement),
            "loan_statement" => Ok(DocumentKind::LoanStatement),
            "debt_statement" => Ok(DocumentKind::DebtStatement),
            "bill" => Ok(DocumentKind::Bill),
            other => Err(crate::error::HelixError::UnsupportedDocumentKind(
                other.to_string(),
            )),
        }
    }
}

/// One line item on a bank or card statement. Amounts are signed:
/// deposits positive, withdrawals negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
}

/// The field dictionary produced by the external extraction boundary.
/// Every field is optional — which fields are populated depends on the
/// document kind and on how much the extractor could read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub gross_pay: Option<f64>,
    pub pay_period_start: Option<NaiveDate>,
    pub pay_period_end: Option<NaiveDate>,
    pub employer_name: Option<String>,

    pub adjusted_gross_income: Option<f64>,
    pub total_income: Option<f64>,

    pub opening_balance: Option<f64>,
    #[serde(default)]
    pub transactions: Option<Vec<Transaction>>,

    pub balance: Option<f64>,
    pub credit_limit: Option<f64>,
    pub minimum_payment: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub payment_status: Option<String>,
}

impl ExtractedFields {
    /// True when the extractor produced nothing at all — the signature
    /// of an unreadable source.
    pub fn is_empty(&self) -> bool {
        self.gross_pay.is_none()
            && self.pay_period_start.is_none()
            && self.pay_period_end.is_none()
            && self.employer_name.is_none()
            && self.adjusted_gross_income.is_none()
            && self.total_income.is_none()
            && self.opening_balance.is_none()
            && self.transactions.is_none()
            && self.balance.is_none()
            && self.credit_limit.is_none()
            && self.minimum_payment.is_none()
            && self.due_date.is_none()
            && self.payment_status.is_none()
    }
}

/// Typed per-document metrics produced by the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetrics {
    pub monthly_income: Option<f64>,
    pub employer_name: Option<String>,
    pub pay_period_start: Option<NaiveDate>,
    pub pay_period_end: Option<NaiveDate>,

    pub average_monthly_balance: Option<f64>,
    pub overdraft_frequency: Option<u32>,
    pub payment_timeliness: Option<f64>,
    pub savings_rate: Option<f64>,

    pub balance: Option<f64>,
    pub credit_limit: Option<f64>,
    pub minimum_payment: Option<f64>,
    pub due_date: Option<NaiveDate>,
    pub payment_status: Option<String>,

    /// Carried through so the aggregator can scan for recurring debt
    /// payments across the whole document set.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

/// Outcome of normalization, as recorded on the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Uploaded, not yet normalized.
    Pending,
    Ok,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Ok => "ok",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = crate::error::HelixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "ok" => Ok(DocumentStatus::Ok),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(crate::error::HelixError::Validation(format!(
                "unknown document status '{other}'"
            ))),
        }
    }
}

/// What the pipeline writes back into a document's normalized slot:
/// either the derived metrics or a failure marker with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationOutcome {
    Metrics(DocumentMetrics),
    Failure(String),
}

/// A document as held by the document store: extracted input plus the
/// normalized slot. Re-running normalization replaces the slot in
/// place — the document row itself is not append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub id: DocumentId,
    pub subject_id: SubjectId,
    pub kind: DocumentKind,
    pub extracted: ExtractedFields,
    pub status: DocumentStatus,
    pub metrics: Option<DocumentMetrics>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NormalizedDocument {
    /// A freshly uploaded document awaiting normalization.
    pub fn pending(subject_id: &str, kind: DocumentKind, extracted: ExtractedFields) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            kind,
            extracted,
            status: DocumentStatus::Pending,
            metrics: None,
            failure_reason: None,
            created_at: Utc::now(),
        }
    }
}
