//! Feature Aggregator tests: reconciliation rules, defaults, and the
//! order-independence guarantee.

use chrono::{NaiveDate, Utc};
use helix_core::{
    aggregator::FeatureAggregator,
    config::ScoringConfig,
    document::{
        DocumentKind, DocumentMetrics, DocumentStatus, ExtractedFields, NormalizedDocument,
        Transaction,
    },
};

fn doc(id: &str, kind: DocumentKind, metrics: DocumentMetrics) -> NormalizedDocument {
    NormalizedDocument {
        id: id.to_string(),
        subject_id: "s-001".to_string(),
        kind,
        extracted: ExtractedFields::default(),
        status: DocumentStatus::Ok,
        metrics: Some(metrics),
        failure_reason: None,
        created_at: Utc::now(),
    }
}

fn pay_stub(id: &str, income: f64, employer: Option<&str>) -> NormalizedDocument {
    doc(
        id,
        DocumentKind::PayStub,
        DocumentMetrics {
            monthly_income: Some(income),
            employer_name: employer.map(|e| e.to_string()),
            ..DocumentMetrics::default()
        },
    )
}

fn txn(day: u32, amount: f64, description: &str) -> Transaction {
    Transaction {
        date: NaiveDate::from_ymd_opt(2024, 1, day).expect("valid test date"),
        amount,
        description: description.to_string(),
    }
}

#[test]
fn income_averages_pay_stubs_and_reports_variance() {
    let config = ScoringConfig::default();
    let docs = vec![pay_stub("a", 4000.0, None), pay_stub("b", 4200.0, None)];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    assert_eq!(vector.monthly_income, Some(4100.0));
    // Population stdev of {4000, 4200} is 100.
    let variance = vector.monthly_income_variance.unwrap();
    assert!(
        (variance - 100.0 / 4100.0).abs() < 1e-12,
        "expected cv of 100/4100, got {variance}"
    );
}

#[test]
fn single_pay_stub_reports_no_variance() {
    let config = ScoringConfig::default();
    let docs = vec![pay_stub("a", 4000.0, None)];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    assert_eq!(vector.monthly_income, Some(4000.0));
    assert_eq!(vector.monthly_income_variance, None);
}

#[test]
fn tax_return_supersedes_disagreeing_pay_stubs() {
    let config = ScoringConfig::default();
    let mut docs = vec![pay_stub("a", 4000.0, None), pay_stub("b", 4200.0, None)];
    docs.push(doc(
        "c",
        DocumentKind::TaxReturn,
        DocumentMetrics {
            monthly_income: Some(6000.0),
            ..DocumentMetrics::default()
        },
    ));
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    // 6000 vs 4100 disagrees by ~46%, above the 20% tolerance.
    assert_eq!(vector.monthly_income, Some(6000.0));
}

#[test]
fn tax_return_within_tolerance_keeps_the_stub_average() {
    let config = ScoringConfig::default();
    let docs = vec![
        pay_stub("a", 4000.0, None),
        pay_stub("b", 4200.0, None),
        doc(
            "c",
            DocumentKind::TaxReturn,
            DocumentMetrics {
                monthly_income: Some(4300.0),
                ..DocumentMetrics::default()
            },
        ),
    ];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    assert_eq!(vector.monthly_income, Some(4100.0));
}

#[test]
fn tax_return_stands_alone_without_pay_stubs() {
    let config = ScoringConfig::default();
    let docs = vec![doc(
        "c",
        DocumentKind::TaxReturn,
        DocumentMetrics {
            monthly_income: Some(5000.0),
            ..DocumentMetrics::default()
        },
    )];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    assert_eq!(vector.monthly_income, Some(5000.0));
}

#[test]
fn distinct_employers_count_as_income_streams() {
    let config = ScoringConfig::default();
    let docs = vec![
        pay_stub("a", 3000.0, Some("Acme Corp")),
        pay_stub("b", 3000.0, Some("Acme Corp")),
        pay_stub("c", 1500.0, Some("Beta LLC")),
    ];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    assert_eq!(vector.multiple_income_streams, Some(2));
}

#[test]
fn cash_flow_fields_average_across_statements() {
    let config = ScoringConfig::default();
    let docs = vec![
        doc(
            "a",
            DocumentKind::BankStatement,
            DocumentMetrics {
                average_monthly_balance: Some(2000.0),
                overdraft_frequency: Some(2),
                savings_rate: Some(10.0),
                ..DocumentMetrics::default()
            },
        ),
        doc(
            "b",
            DocumentKind::BankStatement,
            DocumentMetrics {
                average_monthly_balance: Some(4000.0),
                overdraft_frequency: Some(0),
                savings_rate: Some(30.0),
                ..DocumentMetrics::default()
            },
        ),
    ];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    assert_eq!(vector.average_monthly_balance, Some(3000.0));
    assert_eq!(vector.overdraft_frequency, Some(1.0));
    assert_eq!(vector.savings_rate, Some(20.0));
}

#[test]
fn emergency_fund_coverage_needs_balance_and_income() {
    let config = ScoringConfig::default();
    let docs = vec![
        pay_stub("a", 4000.0, None),
        doc(
            "b",
            DocumentKind::BankStatement,
            DocumentMetrics {
                average_monthly_balance: Some(5600.0),
                ..DocumentMetrics::default()
            },
        ),
    ];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    // 5600 / (4000 * 0.7) = 2 months of runway.
    let coverage = vector.emergency_fund_coverage.unwrap();
    assert!((coverage - 2.0).abs() < 1e-9, "expected 2.0, got {coverage}");
}

#[test]
fn payment_timeliness_feeds_every_behavior_signal() {
    let config = ScoringConfig::default();
    let docs = vec![
        doc(
            "a",
            DocumentKind::BankStatement,
            DocumentMetrics {
                payment_timeliness: Some(80.0),
                ..DocumentMetrics::default()
            },
        ),
        doc(
            "b",
            DocumentKind::BankStatement,
            DocumentMetrics {
                payment_timeliness: Some(60.0),
                ..DocumentMetrics::default()
            },
        ),
    ];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    assert_eq!(vector.payment_timeliness, Some(70.0));
    assert_eq!(vector.bill_payment_consistency, Some(70.0));
    assert_eq!(vector.rent_payment_history, Some(70.0));
    assert_eq!(vector.utility_payment_patterns, Some(70.0));
}

#[test]
fn recurring_debt_payments_cluster_within_tolerance() {
    let config = ScoringConfig::default();
    let docs = vec![
        pay_stub("a", 4000.0, None),
        doc(
            "b",
            DocumentKind::BankStatement,
            DocumentMetrics {
                transactions: vec![
                    txn(1, -350.0, "Car payment"),
                    txn(15, -350.5, "Car payment"),
                    txn(20, -120.0, "Student loan"), // once only, not recurring
                    txn(25, -80.0, "Groceries"),     // no debt keyword
                ],
                ..DocumentMetrics::default()
            },
        ),
    ];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    let monthly = vector.monthly_debt_payments.unwrap();
    assert!(
        (monthly - 350.25).abs() < 1e-9,
        "expected cluster mean 350.25, got {monthly}"
    );
    let dti = vector.debt_to_income_ratio.unwrap();
    assert!((dti - 350.25 / 4000.0).abs() < 1e-12);
}

#[test]
fn credit_utilization_averages_card_statements() {
    let config = ScoringConfig::default();
    let docs = vec![
        doc(
            "a",
            DocumentKind::CreditCardStatement,
            DocumentMetrics {
                balance: Some(1000.0),
                credit_limit: Some(5000.0),
                ..DocumentMetrics::default()
            },
        ),
        doc(
            "b",
            DocumentKind::CreditCardStatement,
            DocumentMetrics {
                balance: Some(3000.0),
                credit_limit: Some(5000.0),
                ..DocumentMetrics::default()
            },
        ),
    ];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    assert_eq!(vector.credit_utilization, Some(40.0));
}

#[test]
fn identity_defaults_apply_when_not_derivable() {
    let config = ScoringConfig::default();
    let vector = FeatureAggregator::new(&config).aggregate(&[pay_stub("a", 4000.0, None)]);

    assert_eq!(vector.document_authenticity, Some(90.0));
    assert_eq!(vector.address_verification, Some(true));
    assert_eq!(vector.phone_number_stability, Some(12.0));
}

#[test]
fn profile_completeness_tracks_core_fields() {
    let config = ScoringConfig::default();

    let sparse = FeatureAggregator::new(&config).aggregate(&[pay_stub("a", 4000.0, None)]);
    assert_eq!(sparse.profile_completeness, 25.0);

    let full_docs = vec![
        pay_stub("a", 4000.0, None),
        doc(
            "b",
            DocumentKind::BankStatement,
            DocumentMetrics {
                average_monthly_balance: Some(3000.0),
                payment_timeliness: Some(85.0),
                transactions: vec![
                    txn(1, -350.0, "Car payment"),
                    txn(15, -350.0, "Car payment"),
                ],
                ..DocumentMetrics::default()
            },
        ),
    ];
    let full = FeatureAggregator::new(&config).aggregate(&full_docs);
    assert_eq!(full.profile_completeness, 100.0);
}

#[test]
fn failed_documents_are_skipped() {
    let config = ScoringConfig::default();
    let mut failed = doc("z", DocumentKind::PayStub, DocumentMetrics::default());
    failed.status = DocumentStatus::Failed;
    failed.metrics = None;
    failed.failure_reason = Some("unreadable source".to_string());

    let docs = vec![pay_stub("a", 4000.0, None), failed];
    let vector = FeatureAggregator::new(&config).aggregate(&docs);

    assert_eq!(vector.monthly_income, Some(4000.0));
}

/// The aggregation result is a pure function of the document SET:
/// shuffling the input order changes nothing, byte for byte.
#[test]
fn aggregation_is_order_independent() {
    let config = ScoringConfig::default();
    let docs = vec![
        pay_stub("a", 4000.0, Some("Acme Corp")),
        pay_stub("b", 4200.0, Some("Beta LLC")),
        doc(
            "c",
            DocumentKind::BankStatement,
            DocumentMetrics {
                average_monthly_balance: Some(3123.45),
                overdraft_frequency: Some(1),
                savings_rate: Some(17.5),
                payment_timeliness: Some(88.0),
                transactions: vec![
                    txn(1, -350.0, "Car payment"),
                    txn(15, -350.5, "Car payment"),
                    txn(20, -220.25, "Student loan"),
                    txn(28, -219.75, "Student loan"),
                ],
                ..DocumentMetrics::default()
            },
        ),
        doc(
            "d",
            DocumentKind::CreditCardStatement,
            DocumentMetrics {
                balance: Some(1234.56),
                credit_limit: Some(4000.0),
                ..DocumentMetrics::default()
            },
        ),
    ];

    let aggregator = FeatureAggregator::new(&config);
    let baseline = aggregator.aggregate(&docs);

    let permutations: [[usize; 4]; 4] = [
        [3, 2, 1, 0],
        [1, 3, 0, 2],
        [2, 0, 3, 1],
        [0, 2, 1, 3],
    ];
    for order in permutations {
        let shuffled: Vec<_> = order.iter().map(|&i| docs[i].clone()).collect();
        let vector = aggregator.aggregate(&shuffled);
        assert_eq!(
            serde_json::to_string(&vector).unwrap(),
            serde_json::to_string(&baseline).unwrap(),
            "aggregation output depends on input order {order:?}"
        );
    }
}
