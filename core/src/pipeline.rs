//! Pipeline Orchestrator.
//!
//! Sequences normalize → aggregate → score → persist → monitor for one
//! document trigger or a whole subject, and is the unit of idempotence
//! and failure isolation.
//!
//! RULES:
//!   - A normalization failure is recorded on its document and stops
//!     that document only; no other document or profile is touched.
//!   - After any successful normalization the subject's ENTIRE
//!     document set is re-aggregated and a brand-new profile snapshot
//!     plus history row is appended. Never merged, never skipped.
//!   - Aggregate+score+persist is serialized per subject; different
//!     subjects proceed fully in parallel.
//!   - Transient store failures get a bounded retry; validation and
//!     extraction errors never do.

use crate::{
    aggregator::FeatureAggregator,
    config::ScoringConfig,
    document::{DocumentMetrics, NormalizationOutcome, NormalizedDocument},
    error::{HelixError, HelixResult},
    monitoring::{self, MonitoringResult},
    profile::RiskProfile,
    scorer::RiskScorer,
    store::HelixStore,
    types::{DocumentId, SubjectId},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Processing states of one trigger, logged as the pipeline advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Normalizing,
    Normalized,
    Failed,
    Aggregating,
    Scoring,
    Persisted,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::Normalizing => "normalizing",
            PipelineStage::Normalized => "normalized",
            PipelineStage::Failed => "failed",
            PipelineStage::Aggregating => "aggregating",
            PipelineStage::Scoring => "scoring",
            PipelineStage::Persisted => "persisted",
        }
    }
}

/// Result of a batch run over a subject's pending documents.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub normalized: Vec<DocumentId>,
    pub failed: Vec<(DocumentId, String)>,
    /// Present when at least one document normalized and a fresh
    /// snapshot was appended.
    pub profile: Option<RiskProfile>,
}

/// The orchestrator. Stateless apart from the per-subject lock map;
/// safe to share across threads behind an `Arc`.
pub struct Pipeline<S: HelixStore> {
    store: Arc<S>,
    scorer: RiskScorer,
    subject_locks: Mutex<HashMap<SubjectId, Arc<Mutex<()>>>>,
}

impl<S: HelixStore> Pipeline<S> {
    pub fn new(store: Arc<S>, scorer: RiskScorer) -> Self {
        Self {
            store,
            scorer,
            subject_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        self.scorer.config()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Core-exposed operations ────────────────────────────────

    /// Normalize one document and record the outcome on it. Returns
    /// the derived metrics, or the extraction error after writing the
    /// failure marker.
    pub fn normalize_document(&self, id: &DocumentId) -> HelixResult<DocumentMetrics> {
        let document = self.with_retry("get_document", || self.store.get_document(id))?;
        self.normalize_step(&document)
    }

    /// Full per-trigger pipeline: normalize, then re-aggregate the
    /// subject's entire document set and append a new snapshot.
    pub fn process_document(&self, id: &DocumentId) -> HelixResult<RiskProfile> {
        log::debug!("document {id}: {}", PipelineStage::Received.as_str());
        let document = self.with_retry("get_document", || self.store.get_document(id))?;
        self.normalize_step(&document)?;
        self.score_subject(&document.subject_id)
    }

    /// Batch entry point: normalize every pending document for the
    /// subject, tolerating individual failures, then append one fresh
    /// snapshot when anything normalized.
    pub fn process_pending(&self, subject_id: &SubjectId) -> HelixResult<BatchOutcome> {
        let pending =
            self.with_retry("list_unnormalized", || self.store.list_unnormalized(subject_id))?;

        let mut outcome = BatchOutcome {
            normalized: Vec::new(),
            failed: Vec::new(),
            profile: None,
        };

        for document in &pending {
            match self.normalize_step(document) {
                Ok(_) => outcome.normalized.push(document.id.clone()),
                Err(e) => {
                    log::warn!("document {} failed in batch: {e}", document.id);
                    outcome.failed.push((document.id.clone(), e.to_string()));
                }
            }
        }

        if !outcome.normalized.is_empty() {
            outcome.profile = Some(self.score_subject(subject_id)?);
        }
        Ok(outcome)
    }

    /// Re-aggregate and re-score the subject's already-normalized
    /// document set, appending a new snapshot.
    pub fn recompute_profile(&self, subject_id: &SubjectId) -> HelixResult<RiskProfile> {
        self.score_subject(subject_id)
    }

    /// On-demand monitoring: compare the two most recent snapshots
    /// against the current feature vector and append any alerts. Does
    /// not create a new profile.
    pub fn evaluate_monitoring(&self, subject_id: &SubjectId) -> HelixResult<MonitoringResult> {
        let latest = self
            .with_retry("latest_profile", || self.store.latest_profile(subject_id))?
            .ok_or_else(|| HelixError::ProfileNotFound(subject_id.clone()))?;
        let prior = self.with_retry("prior_profile", || {
            self.store.prior_profile(subject_id, &latest.id)
        })?;

        let documents =
            self.with_retry("list_documents", || self.store.list_documents(subject_id))?;
        let vector = FeatureAggregator::new(self.config()).aggregate(&documents);

        let result = monitoring::evaluate(
            subject_id,
            latest.helix_score,
            prior.map(|p| p.helix_score),
            &vector,
            &self.config().monitoring,
        );
        for alert in &result.alerts {
            self.with_retry("append_alert", || self.store.append_alert(alert))?;
        }
        Ok(result)
    }

    // ── Internals ──────────────────────────────────────────────

    /// Normalize one fetched document and write the outcome back.
    fn normalize_step(&self, document: &NormalizedDocument) -> HelixResult<DocumentMetrics> {
        log::debug!(
            "document {}: {}",
            document.id,
            PipelineStage::Normalizing.as_str()
        );

        match crate::normalizer::normalize(
            &document.id,
            document.kind,
            &document.extracted,
            self.config(),
        ) {
            Ok(metrics) => {
                self.with_retry("set_normalized", || {
                    self.store
                        .set_normalized(&document.id, &NormalizationOutcome::Metrics(metrics.clone()))
                })?;
                log::debug!(
                    "document {}: {}",
                    document.id,
                    PipelineStage::Normalized.as_str()
                );
                Ok(metrics)
            }
            Err(e) => {
                // Record the failure on the document and stop this
                // trigger. The subject's other documents and profile
                // stay untouched.
                self.with_retry("set_normalized", || {
                    self.store.set_normalized(
                        &document.id,
                        &NormalizationOutcome::Failure(e.to_string()),
                    )
                })?;
                log::warn!(
                    "document {}: {} ({e})",
                    document.id,
                    PipelineStage::Failed.as_str()
                );
                Err(e)
            }
        }
    }

    /// Aggregate → score → persist → monitor, serialized per subject.
    fn score_subject(&self, subject_id: &SubjectId) -> HelixResult<RiskProfile> {
        let lock = self.subject_lock(subject_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| HelixError::Other(anyhow::anyhow!("subject lock poisoned")))?;

        log::debug!("subject {subject_id}: {}", PipelineStage::Aggregating.as_str());
        let documents =
            self.with_retry("list_documents", || self.store.list_documents(subject_id))?;
        if documents.is_empty() {
            return Err(HelixError::SubjectNotFound(subject_id.clone()));
        }

        let vector = FeatureAggregator::new(self.config()).aggregate(&documents);

        log::debug!("subject {subject_id}: {}", PipelineStage::Scoring.as_str());
        let report = self.scorer.score(&vector)?;
        let profile = RiskProfile::from_report(subject_id, &report);

        self.with_retry("append_profile", || self.store.append_profile(&profile))?;
        self.with_retry("append_history", || {
            self.store.append_history(&profile.history_entry())
        })?;

        let prior = self.with_retry("prior_profile", || {
            self.store.prior_profile(subject_id, &profile.id)
        })?;
        let monitoring_result = monitoring::evaluate(
            subject_id,
            profile.helix_score,
            prior.map(|p| p.helix_score),
            &vector,
            &self.config().monitoring,
        );
        for alert in &monitoring_result.alerts {
            self.with_retry("append_alert", || self.store.append_alert(alert))?;
        }

        log::info!(
            "subject {subject_id}: {} — helix score {:.1} ({}), {} alert(s)",
            PipelineStage::Persisted.as_str(),
            profile.helix_score,
            profile.category.as_str(),
            monitoring_result.alerts.len(),
        );
        Ok(profile)
    }

    fn subject_lock(&self, subject_id: &SubjectId) -> HelixResult<Arc<Mutex<()>>> {
        let mut locks = self
            .subject_locks
            .lock()
            .map_err(|_| HelixError::Other(anyhow::anyhow!("lock map poisoned")))?;
        Ok(locks.entry(subject_id.clone()).or_default().clone())
    }

    /// Bounded retry for transient store failures. Deterministic
    /// errors (validation, extraction, lookups) fail immediately.
    fn with_retry<T>(&self, op: &str, mut f: impl FnMut() -> HelixResult<T>) -> HelixResult<T> {
        let max = self.config().max_store_retries;
        let mut attempt = 0;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max => {
                    attempt += 1;
                    log::warn!("{op} failed (attempt {attempt}/{max}): {e}; retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
