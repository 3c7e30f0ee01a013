//! Reconciliation orchestrator
//!
//! Queries the configured source adapters in order for one raw address,
//! scores every answer against the normalized input and keeps the best.
//!
//! # State Progression
//! PENDING → (TRYING → SCORED | FAILED)* → EARLY_STOP | EXHAUSTED → CLASSIFIED
//!
//! Adapter failures (errors, timeouts, panics) are recorded on the result and
//! never abort the reconciliation. There are no retries: each adapter is
//! called at most once per address.

pub mod batch;

pub use batch::{reconcile_batch, BatchOutcome};

use chrono::Utc;
use futures::FutureExt;
use geomatch_common::{EngineConfig, EventBus, ReconEvent};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapters::{AdapterError, AdapterResponse, SourceAdapter};
use crate::matching::{
    classify, extract_postal_code, normalize, normalize_postal_code, score, score_with_postal_code,
};
use crate::models::{
    AdapterFailure, CandidateResult, NormalizedAddress, PostalCode, ReconciledAddress, Termination,
};

/// Orchestrator tuning
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Upper bound on a single adapter call
    pub adapter_timeout: Duration,
    /// Adjusted score at which remaining adapters are skipped
    pub early_stop_score: f64,
    /// Audit sink; events are dropped silently when nobody listens
    pub event_bus: Option<EventBus>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(5),
            early_stop_score: 95.0,
            event_bus: None,
        }
    }
}

impl OrchestratorOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            adapter_timeout: config.adapter_timeout(),
            early_stop_score: config.early_stop_score,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }
}

/// Per-address progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationState {
    Pending,
    Trying,
    Scored,
    Failed,
    EarlyStop,
    Exhausted,
    Classified,
}

/// Whether adapter iteration continues after a recorded answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Stop,
}

/// Mutable bookkeeping for one reconciliation, owned by a single call
struct Reconciliation<'a> {
    id: Uuid,
    raw: &'a str,
    normalized: NormalizedAddress,
    postal_code: Option<PostalCode>,
    candidates: Vec<CandidateResult>,
    failures: Vec<AdapterFailure>,
    winner: Option<String>,
    best_score: f64,
    state: ReconciliationState,
}

impl<'a> Reconciliation<'a> {
    fn start(raw: &'a str) -> Self {
        let normalized = normalize(raw);
        let postal_code = extract_postal_code(raw).map(|code| normalize_postal_code(&code));

        Self {
            id: Uuid::new_v4(),
            raw,
            normalized,
            postal_code,
            candidates: Vec::new(),
            failures: Vec::new(),
            winner: None,
            best_score: 0.0,
            state: ReconciliationState::Pending,
        }
    }

    fn transition_to(&mut self, new_state: ReconciliationState) {
        debug!(
            id = %self.id,
            from = ?self.state,
            to = ?new_state,
            "Reconciliation state transition"
        );
        self.state = new_state;
    }
}

/// Sequential, early-exiting adapter orchestrator
///
/// Immutable after construction; share it behind an `Arc` to reconcile from
/// several tasks.
pub struct ReconciliationOrchestrator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    options: OrchestratorOptions,
}

impl ReconciliationOrchestrator {
    /// Adapters are queried in the order given
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, options: OrchestratorOptions) -> Self {
        Self { adapters, options }
    }

    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Reconcile one raw address against every configured adapter
    ///
    /// Never fails: with no adapters, or when every adapter fails, the result
    /// has no winner, a best score of 0 and status `NO_MATCH`.
    pub async fn reconcile(&self, raw: &str) -> ReconciledAddress {
        let mut run = Reconciliation::start(raw);

        for adapter in &self.adapters {
            run.transition_to(ReconciliationState::Trying);
            let outcome = self.invoke(adapter.as_ref(), raw).await;
            if self.record(&mut run, adapter.name(), outcome) == Step::Stop {
                break;
            }
        }

        self.finish(run)
    }

    /// [`Self::reconcile`], abandoned when `cancel` fires
    ///
    /// Returns `None` if the token is cancelled before the address is
    /// classified; an in-flight adapter call is dropped.
    pub async fn reconcile_with_cancel(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> Option<ReconciledAddress> {
        if cancel.is_cancelled() {
            return None;
        }

        let mut run = Reconciliation::start(raw);

        for adapter in &self.adapters {
            run.transition_to(ReconciliationState::Trying);
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(id = %run.id, source = adapter.name(), "Reconciliation cancelled");
                    return None;
                }
                outcome = self.invoke(adapter.as_ref(), raw) => outcome,
            };
            if self.record(&mut run, adapter.name(), outcome) == Step::Stop {
                break;
            }
        }

        Some(self.finish(run))
    }

    /// Call one adapter under the per-call timeout, turning a panic into an error
    async fn invoke(
        &self,
        adapter: &dyn SourceAdapter,
        raw: &str,
    ) -> Result<AdapterResponse, AdapterError> {
        let timeout = self.options.adapter_timeout;
        let call = AssertUnwindSafe(adapter.validate(raw)).catch_unwind();

        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(AdapterError::Panicked(panic_message(&*payload))),
            Err(_) => Err(AdapterError::Timeout(timeout)),
        }
    }

    fn record(
        &self,
        run: &mut Reconciliation<'_>,
        source: &str,
        outcome: Result<AdapterResponse, AdapterError>,
    ) -> Step {
        match outcome {
            Ok(response) => self.record_success(run, source, response),
            Err(err) => {
                self.record_failure(run, source, err);
                Step::Continue
            }
        }
    }

    fn record_success(
        &self,
        run: &mut Reconciliation<'_>,
        source: &str,
        response: AdapterResponse,
    ) -> Step {
        let normalized_matched = normalize(&response.matched_address);
        let candidate_code = response
            .metadata
            .get("cep")
            .and_then(Value::as_str)
            .map(normalize_postal_code);

        let base_score = score(run.normalized.as_str(), normalized_matched.as_str());
        let adjusted_score = score_with_postal_code(
            run.normalized.as_str(),
            normalized_matched.as_str(),
            run.postal_code.as_ref().map(PostalCode::as_str),
            candidate_code.as_ref().map(PostalCode::as_str),
        );

        debug!(
            id = %run.id,
            source = %source,
            base_score,
            adjusted_score,
            reported_score = ?response.score,
            "Adapter answer scored"
        );

        run.candidates.push(CandidateResult {
            source: source.to_string(),
            matched_address: response.matched_address,
            normalized_matched,
            postal_code: candidate_code,
            base_score,
            adjusted_score,
            reported_score: response.score,
            classification: classify(adjusted_score),
            metadata: response.metadata,
        });
        run.transition_to(ReconciliationState::Scored);

        // Ties go to the later adapter
        if adjusted_score >= run.best_score {
            run.best_score = adjusted_score;
            run.winner = Some(source.to_string());
        }

        if adjusted_score >= self.options.early_stop_score {
            run.transition_to(ReconciliationState::EarlyStop);
            Step::Stop
        } else {
            Step::Continue
        }
    }

    fn record_failure(&self, run: &mut Reconciliation<'_>, source: &str, err: AdapterError) {
        let error = err.to_string();

        warn!(
            source = %source,
            error = %error,
            address = %run.raw,
            "Adapter failed, continuing with next adapter"
        );

        if let Some(bus) = &self.options.event_bus {
            bus.emit_lossy(ReconEvent::AdapterFailed {
                source: source.to_string(),
                error: error.clone(),
                address: run.raw.to_string(),
                timestamp: Utc::now(),
            });
        }

        run.failures.push(AdapterFailure {
            source: source.to_string(),
            kind: err.kind(),
            error,
            occurred_at: Utc::now(),
        });
        run.transition_to(ReconciliationState::Failed);
    }

    fn finish(&self, mut run: Reconciliation<'_>) -> ReconciledAddress {
        let termination = if run.state == ReconciliationState::EarlyStop {
            Termination::EarlyStop
        } else {
            run.transition_to(ReconciliationState::Exhausted);
            Termination::Exhausted
        };

        // Nothing succeeded: best score stays 0, which classifies as NO_MATCH
        let status = classify(run.best_score);
        run.transition_to(ReconciliationState::Classified);

        debug!(
            id = %run.id,
            winner = ?run.winner,
            best_score = run.best_score,
            status = %status,
            "Address reconciled"
        );

        if let Some(bus) = &self.options.event_bus {
            bus.emit_lossy(ReconEvent::AddressReconciled {
                id: run.id,
                address: run.raw.to_string(),
                winner: run.winner.clone(),
                best_score: run.best_score,
                status: status.to_string(),
                timestamp: Utc::now(),
            });
        }

        ReconciledAddress {
            id: run.id,
            raw: run.raw.to_string(),
            normalized: run.normalized,
            postal_code: run.postal_code,
            candidates: run.candidates,
            failures: run.failures,
            winner: run.winner,
            best_score: run.best_score,
            status,
            termination,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
