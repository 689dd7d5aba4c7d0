//! helix-runner: headless scoring runner.
//!
//! Ingests a JSON batch of extracted documents, drives the full
//! pipeline for every subject in the batch, and prints a scoring
//! summary. Stands in for the HTTP layer during development and
//! load-shaped testing.
//!
//! Usage:
//!   helix-runner --input documents.json --db helix.db
//!   helix-runner --input documents.json --config scoring.json

use anyhow::Result;
use helix_core::{
    config::ScoringConfig,
    document::{DocumentKind, ExtractedFields, NormalizedDocument},
    pipeline::Pipeline,
    scorer::RiskScorer,
    store::{AlertStore, DocumentStore, SqliteStore},
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Deserialize)]
struct BatchDocument {
    subject_id: String,
    kind: String,
    #[serde(default)]
    extracted: ExtractedFields,
}

#[derive(Deserialize)]
struct BatchFile {
    documents: Vec<BatchDocument>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = arg_value(&args, "--input");
    let db = arg_value(&args, "--db").unwrap_or_else(|| ":memory:".to_string());
    let config = match arg_value(&args, "--config") {
        Some(path) => ScoringConfig::load(&path)?,
        None => ScoringConfig::default(),
    };
    config.validate()?;

    let Some(input) = input else {
        eprintln!("usage: helix-runner --input documents.json [--db helix.db] [--config scoring.json]");
        std::process::exit(2);
    };

    let store = Arc::new(SqliteStore::open(&db)?);
    store.migrate()?;

    let content = std::fs::read_to_string(&input)
        .map_err(|e| anyhow::anyhow!("Cannot read {input}: {e}"))?;
    let batch: BatchFile = serde_json::from_str(&content)?;

    println!("helix-runner");
    println!("  input:     {input}");
    println!("  db:        {db}");
    println!("  documents: {}", batch.documents.len());
    println!();

    let mut subjects: BTreeSet<String> = BTreeSet::new();
    for entry in batch.documents {
        let kind = DocumentKind::from_str(&entry.kind)?;
        let document = NormalizedDocument::pending(&entry.subject_id, kind, entry.extracted);
        store.insert_document(&document)?;
        subjects.insert(entry.subject_id);
    }

    let pipeline = Pipeline::new(store.clone(), RiskScorer::new(config));

    for subject in &subjects {
        let outcome = pipeline.process_pending(subject)?;
        print_subject_summary(&pipeline, subject, &outcome)?;
    }

    Ok(())
}

fn print_subject_summary(
    pipeline: &Pipeline<SqliteStore>,
    subject: &str,
    outcome: &helix_core::pipeline::BatchOutcome,
) -> Result<()> {
    println!("=== SUBJECT {subject} ===");
    println!("  normalized:  {}", outcome.normalized.len());
    println!("  failed:      {}", outcome.failed.len());
    for (id, reason) in &outcome.failed {
        println!("    {id}: {reason}");
    }

    if let Some(profile) = &outcome.profile {
        println!("  helix score: {:.1}", profile.helix_score);
        println!("  category:    {}", profile.category.as_str());
        println!("  grade:       {}", profile.letter_grade.as_str());
        println!("  confidence:  {:.2}", profile.confidence);
        println!(
            "  flags:       high_risk={} manual_review={} fast_track={} prime={}",
            profile.flags.high_risk,
            profile.flags.requires_manual_review,
            profile.flags.fast_track_eligible,
            profile.flags.prime_customer,
        );
        println!("  summary:     {}", profile.explanation.summary);

        let alerts = pipeline.store().alerts_for_subject(&subject.to_string())?;
        if alerts.is_empty() {
            println!("  alerts:      none");
        } else {
            println!("  alerts:");
            for alert in alerts {
                println!(
                    "    [{}] {}: {}",
                    alert.severity.as_str(),
                    alert.alert_type.as_str(),
                    alert.message
                );
            }
        }
    } else {
        println!("  no profile produced (nothing normalized)");
    }
    println!();
    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}
