//! Continuous monitoring.
//!
//! Compares a subject's new score against the immediately preceding
//! one and the current feature vector, and raises typed alerts. This
//! evaluator is the single alerting path: the pipeline calls it after
//! every persisted snapshot, and `evaluate_monitoring` runs it on
//! demand — there is no separate generic recompute alert.

use crate::{config::MonitoringThresholds, feature::FeatureVector, types::SubjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ScoreIncrease,
    IncomeDrop,
    PaymentIssues,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::ScoreIncrease => "score_increase",
            AlertType::IncomeDrop => "income_drop",
            AlertType::PaymentIssues => "payment_issues",
        }
    }
}

impl std::str::FromStr for AlertType {
    type Err = crate::error::HelixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "score_increase" => Ok(AlertType::ScoreIncrease),
            "income_drop" => Ok(AlertType::IncomeDrop),
            "payment_issues" => Ok(AlertType::PaymentIssues),
            other => Err(crate::error::HelixError::Validation(format!(
                "unknown alert type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = crate::error::HelixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            "critical" => Ok(AlertSeverity::Critical),
            other => Err(crate::error::HelixError::Validation(format!(
                "unknown alert severity '{other}'"
            ))),
        }
    }
}

/// Append-only monitoring alert. Resolution is an external workflow
/// concern beyond the boolean flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub id: String,
    pub subject_id: SubjectId,
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub previous_score: Option<f64>,
    pub current_score: f64,
    pub delta: Option<f64>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringResult {
    pub alerts: Vec<RiskAlert>,
    pub intervention_required: bool,
}

/// Evaluate the monitoring rules. Each rule fires independently; all
/// may fire together. `previous_score` is None when the subject has no
/// prior snapshot, which disables the delta rule.
pub fn evaluate(
    subject_id: &str,
    current_score: f64,
    previous_score: Option<f64>,
    vector: &FeatureVector,
    thresholds: &MonitoringThresholds,
) -> MonitoringResult {
    let now = Utc::now();
    let mut alerts = Vec::new();
    let mut intervention = false;

    let delta = previous_score.map(|prev| current_score - prev);

    if let (Some(prev), Some(delta)) = (previous_score, delta) {
        if delta > thresholds.score_delta_alert {
            let escalated = delta > thresholds.score_delta_intervention;
            alerts.push(RiskAlert {
                id: Uuid::new_v4().to_string(),
                subject_id: subject_id.to_string(),
                alert_type: AlertType::ScoreIncrease,
                severity: if escalated {
                    AlertSeverity::High
                } else {
                    AlertSeverity::Medium
                },
                message: format!(
                    "Risk score increased by {delta:.1} points ({prev:.1} -> {current_score:.1})"
                ),
                previous_score,
                current_score,
                delta: Some(delta),
                resolved: false,
                created_at: now,
            });
            if escalated {
                intervention = true;
            }
        }
    }

    if let Some(variance) = vector.monthly_income_variance {
        if variance > thresholds.income_variance_alert {
            alerts.push(RiskAlert {
                id: Uuid::new_v4().to_string(),
                subject_id: subject_id.to_string(),
                alert_type: AlertType::IncomeDrop,
                severity: AlertSeverity::High,
                message: format!(
                    "Income instability detected: variation of {:.0}% between pay periods",
                    variance * 100.0
                ),
                previous_score,
                current_score,
                delta,
                resolved: false,
                created_at: now,
            });
            intervention = true;
        }
    }

    if let Some(timeliness) = vector.payment_timeliness {
        if timeliness < thresholds.payment_timeliness_alert {
            let critical = timeliness < thresholds.payment_timeliness_critical;
            alerts.push(RiskAlert {
                id: Uuid::new_v4().to_string(),
                subject_id: subject_id.to_string(),
                alert_type: AlertType::PaymentIssues,
                severity: if critical {
                    AlertSeverity::Critical
                } else {
                    AlertSeverity::High
                },
                message: format!(
                    "Payment timeliness dropped to {timeliness:.0}/100 across recent documents"
                ),
                previous_score,
                current_score,
                delta,
                resolved: false,
                created_at: now,
            });
            if critical {
                intervention = true;
            }
        }
    }

    // Severity, delta, and absolute level each force intervention on
    // their own.
    if alerts
        .iter()
        .any(|a| a.severity >= AlertSeverity::High)
    {
        intervention = true;
    }
    if let Some(delta) = delta {
        if delta > thresholds.score_delta_intervention {
            intervention = true;
        }
    }
    if current_score >= thresholds.intervention_score_min {
        intervention = true;
    }

    MonitoringResult {
        alerts,
        intervention_required: intervention,
    }
}
