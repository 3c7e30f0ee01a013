//! Bounded-concurrency batch reconciliation
//!
//! Up to `workers` addresses are reconciled at once. Results come back in
//! input order; cancelled addresses are counted but produce no result.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use geomatch_common::ReconEvent;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use super::ReconciliationOrchestrator;
use crate::models::{RawAddress, ReconciledAddress};

/// Result of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    /// Finished reconciliations, in input order (cancelled ones omitted)
    pub results: Vec<ReconciledAddress>,
    pub completed: usize,
    pub cancelled: usize,
    /// Results per classification label
    pub status_counts: BTreeMap<String, usize>,
}

/// Reconcile `addresses` with at most `workers` in flight (0 is treated as 1)
pub async fn reconcile_batch(
    orchestrator: &ReconciliationOrchestrator,
    addresses: Vec<RawAddress>,
    workers: usize,
    cancel: &CancellationToken,
) -> BatchOutcome {
    let batch_id = Uuid::new_v4();
    let total = addresses.len();
    let workers = workers.max(1);
    let start_time = Instant::now();

    info!(
        batch_id = %batch_id,
        addresses = total,
        workers,
        adapters = ?orchestrator.adapter_names(),
        "Starting batch reconciliation"
    );

    let finished: Vec<Option<ReconciledAddress>> = stream::iter(addresses.iter())
        .map(|raw| orchestrator.reconcile_with_cancel(raw, cancel))
        .buffered(workers)
        .collect()
        .await;

    let results: Vec<ReconciledAddress> = finished.into_iter().flatten().collect();
    let completed = results.len();
    let cancelled = total - completed;

    let mut status_counts = BTreeMap::new();
    for result in &results {
        *status_counts.entry(result.status.to_string()).or_insert(0) += 1;
    }

    info!(
        batch_id = %batch_id,
        completed,
        cancelled,
        elapsed = ?start_time.elapsed(),
        "Batch reconciliation finished"
    );

    if let Some(bus) = &orchestrator.options().event_bus {
        bus.emit_lossy(ReconEvent::BatchCompleted {
            batch_id,
            completed,
            cancelled,
            timestamp: Utc::now(),
        });
    }

    BatchOutcome {
        batch_id,
        results,
        completed,
        cancelled,
        status_counts,
    }
}
