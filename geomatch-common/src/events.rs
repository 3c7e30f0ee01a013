//! Audit event types and the broadcast event bus
//!
//! Reconciliation emits audit events for adapter failures, finished
//! addresses and finished batches. Consumers (persistence, SSE, log
//! shippers) subscribe to the bus; emitting never blocks the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Audit events emitted by the reconciliation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReconEvent {
    /// A source adapter failed or timed out (non-fatal)
    AdapterFailed {
        /// Adapter name
        source: String,
        /// Error message
        error: String,
        /// Raw input address being reconciled
        address: String,
        timestamp: DateTime<Utc>,
    },

    /// One address finished reconciliation
    AddressReconciled {
        /// Reconciliation id
        id: Uuid,
        /// Raw input address
        address: String,
        /// Winning adapter, if any succeeded
        winner: Option<String>,
        best_score: f64,
        /// Classification label (e.g. "MATCH_CONFIRMED")
        status: String,
        timestamp: DateTime<Utc>,
    },

    /// A batch finished (fully or after cancellation)
    BatchCompleted {
        batch_id: Uuid,
        completed: usize,
        cancelled: usize,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`ReconEvent`]
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ReconEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ReconEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ReconEvent) {
        let _ = self.tx.send(event);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
