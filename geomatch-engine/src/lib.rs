//! GeoMatch reconciliation engine
//!
//! Reconciles free-text Brazilian addresses against a configurable, ordered
//! list of source adapters:
//! - `matching`: normalization, postal code (CEP) handling, similarity, classification
//! - `bulk`: address extraction from CSV and pseudo-SQL uploads
//! - `adapters`: source adapter contract and the built-in adapters
//! - `orchestrator`: sequential early-exit reconciliation and batch runs

pub mod adapters;
pub mod bulk;
pub mod matching;
pub mod models;
pub mod orchestrator;

pub use adapters::{AdapterError, AdapterResponse, SourceAdapter};
pub use bulk::{extract_auto, extract_file, BulkError};
pub use matching::{calculate_match_score, classify, normalize, Classification, MatchScore};
pub use models::{CandidateResult, RawAddress, ReconciledAddress};
pub use orchestrator::{
    reconcile_batch, BatchOutcome, OrchestratorOptions, ReconciliationOrchestrator,
};

use geomatch_common::{EngineConfig, EventBus};

/// Build an orchestrator for the configured provider list
///
/// # Errors
/// If a network adapter's HTTP client cannot be constructed.
pub fn build_orchestrator(
    config: &EngineConfig,
    event_bus: Option<EventBus>,
) -> Result<ReconciliationOrchestrator, AdapterError> {
    let settings = adapters::AdapterSettings::from_config(config);
    let adapters = adapters::from_names(&config.providers, &settings)?;

    let mut options = OrchestratorOptions::from_config(config);
    options.event_bus = event_bus;

    Ok(ReconciliationOrchestrator::new(adapters, options))
}
