//! Continuous-monitoring rule tests.

use helix_core::{
    config::ScoringConfig,
    feature::FeatureVector,
    monitoring::{evaluate, AlertSeverity, AlertType},
};

fn thresholds() -> helix_core::config::MonitoringThresholds {
    ScoringConfig::default().monitoring
}

#[test]
fn large_score_jump_raises_high_severity_and_intervention() {
    let result = evaluate(
        "s-001",
        90.0,
        Some(65.0),
        &FeatureVector::default(),
        &thresholds(),
    );

    let alert = result
        .alerts
        .iter()
        .find(|a| a.alert_type == AlertType::ScoreIncrease)
        .expect("delta of 25 must raise a score_increase alert");
    assert_eq!(alert.severity, AlertSeverity::High);
    assert_eq!(alert.delta, Some(25.0));
    assert_eq!(alert.previous_score, Some(65.0));
    assert!(result.intervention_required);
}

#[test]
fn small_score_jump_stays_quiet() {
    let result = evaluate(
        "s-001",
        70.0,
        Some(66.0),
        &FeatureVector::default(),
        &thresholds(),
    );

    assert!(
        !result
            .alerts
            .iter()
            .any(|a| a.alert_type == AlertType::ScoreIncrease),
        "delta of 4 must not raise a score_increase alert"
    );
    // The absolute level still forces intervention at 66+.
    assert!(result.intervention_required);
}

#[test]
fn moderate_jump_is_medium_severity_without_intervention() {
    let result = evaluate(
        "s-001",
        40.0,
        Some(25.0),
        &FeatureVector::default(),
        &thresholds(),
    );

    let alert = result
        .alerts
        .iter()
        .find(|a| a.alert_type == AlertType::ScoreIncrease)
        .expect("delta of 15 raises a score_increase alert");
    assert_eq!(alert.severity, AlertSeverity::Medium);
    assert!(!result.intervention_required);
}

#[test]
fn no_prior_score_disables_the_delta_rule() {
    let result = evaluate("s-001", 90.0, None, &FeatureVector::default(), &thresholds());

    assert!(
        !result
            .alerts
            .iter()
            .any(|a| a.alert_type == AlertType::ScoreIncrease),
        "without a prior snapshot there is no delta to alert on"
    );
    // Score at 90 still demands intervention on its own.
    assert!(result.intervention_required);
}

#[test]
fn income_instability_always_requires_intervention() {
    let vector = FeatureVector {
        monthly_income_variance: Some(0.25),
        ..FeatureVector::default()
    };
    let result = evaluate("s-001", 30.0, Some(28.0), &vector, &thresholds());

    let alert = result
        .alerts
        .iter()
        .find(|a| a.alert_type == AlertType::IncomeDrop)
        .expect("variance above 0.2 must raise income_drop");
    assert_eq!(alert.severity, AlertSeverity::High);
    assert!(result.intervention_required);
}

#[test]
fn payment_issues_escalate_below_fifty() {
    let vector = FeatureVector {
        payment_timeliness: Some(45.0),
        ..FeatureVector::default()
    };
    let result = evaluate("s-001", 30.0, Some(28.0), &vector, &thresholds());

    let alert = result
        .alerts
        .iter()
        .find(|a| a.alert_type == AlertType::PaymentIssues)
        .expect("timeliness below 70 must raise payment_issues");
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert!(result.intervention_required);
}

#[test]
fn payment_issues_between_fifty_and_seventy_are_high() {
    let vector = FeatureVector {
        payment_timeliness: Some(60.0),
        ..FeatureVector::default()
    };
    let result = evaluate("s-001", 30.0, Some(28.0), &vector, &thresholds());

    let alert = result
        .alerts
        .iter()
        .find(|a| a.alert_type == AlertType::PaymentIssues)
        .expect("timeliness of 60 must raise payment_issues");
    assert_eq!(alert.severity, AlertSeverity::High);
    // High severity alone forces intervention.
    assert!(result.intervention_required);
}

#[test]
fn all_rules_can_fire_together() {
    let vector = FeatureVector {
        monthly_income_variance: Some(0.5),
        payment_timeliness: Some(30.0),
        ..FeatureVector::default()
    };
    let result = evaluate("s-001", 88.0, Some(60.0), &vector, &thresholds());

    assert_eq!(result.alerts.len(), 3, "independent rules all fire");
    assert!(result.intervention_required);
}

#[test]
fn quiet_profile_raises_nothing() {
    let vector = FeatureVector {
        monthly_income_variance: Some(0.05),
        payment_timeliness: Some(92.0),
        ..FeatureVector::default()
    };
    let result = evaluate("s-001", 22.0, Some(20.0), &vector, &thresholds());

    assert!(result.alerts.is_empty());
    assert!(!result.intervention_required);
}
