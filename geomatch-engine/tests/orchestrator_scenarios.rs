// Orchestrator integration scenarios
//
// Scripted stub adapters stand in for real sources so every scenario is
// deterministic and offline. Adapter scores are computed by the orchestrator
// from matched text, so the stubs answer with strings at a known edit
// distance from the input: a 100-character single token with `k` leading
// characters changed costs `2k` insertions and deletions out of 200
// characters, so it scores exactly `100 - k`.

use async_trait::async_trait;
use geomatch_common::{EventBus, ReconEvent};
use geomatch_engine::adapters::{
    AdapterError, AdapterResponse, DummyAdapter, LocalAdapter, SourceAdapter,
};
use geomatch_engine::matching::{Classification, POSTAL_CODE_MAX_BOOST};
use geomatch_engine::models::{FailureKind, Termination};
use geomatch_engine::{reconcile_batch, OrchestratorOptions, ReconciliationOrchestrator};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TOKEN_LEN: usize = 100;

/// Input address used by the scored scenarios
fn input() -> String {
    "a".repeat(TOKEN_LEN)
}

/// Matched text scoring `100 - changed` against [`input`]
fn scoring(score: usize) -> String {
    let changed = TOKEN_LEN - score;
    format!("{}{}", "b".repeat(changed), "a".repeat(TOKEN_LEN - changed))
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
}

// ================================================================================================
// Stub adapters
// ================================================================================================

#[derive(Clone)]
enum Reply {
    Match { text: String, cep: Option<&'static str> },
    Fail,
    Sleep(Duration),
    Panic,
}

struct ScriptedAdapter {
    name: &'static str,
    reply: Reply,
    calls: Arc<AtomicUsize>,
}

impl ScriptedAdapter {
    fn new(name: &'static str, reply: Reply) -> Self {
        Self {
            name,
            reply,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn matching(name: &'static str, text: String) -> Self {
        Self::new(name, Reply::Match { text, cep: None })
    }
}

#[async_trait]
impl SourceAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        self.name
    }

    async fn validate(&self, _raw_address: &str) -> Result<AdapterResponse, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Match { text, cep } => {
                let mut response = AdapterResponse::new(text.clone()).with_score(1.0);
                if let Some(cep) = cep {
                    response = response.with_metadata("cep", *cep);
                }
                Ok(response)
            }
            Reply::Fail => Err(AdapterError::Transport("connection refused".to_string())),
            Reply::Sleep(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(AdapterResponse::new("late answer"))
            }
            Reply::Panic => panic!("scripted adapter panic"),
        }
    }
}

/// Sleeps for a long time on inputs containing "slow", answers at once otherwise
struct SelectiveSleepAdapter;

#[async_trait]
impl SourceAdapter for SelectiveSleepAdapter {
    fn name(&self) -> &str {
        "selective"
    }

    async fn validate(&self, raw_address: &str) -> Result<AdapterResponse, AdapterError> {
        if raw_address.contains("slow") {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(AdapterResponse::new(raw_address))
    }
}

fn orchestrator(adapters: Vec<Arc<dyn SourceAdapter>>) -> ReconciliationOrchestrator {
    ReconciliationOrchestrator::new(adapters, OrchestratorOptions::default())
}

// ================================================================================================
// Early exit
// ================================================================================================
//
// Three adapters score 40, 96 and 70. The second reaches the early-stop
// score, so it wins and the third is never called.

#[tokio::test]
async fn early_exit_skips_remaining_adapters() {
    let third = ScriptedAdapter::matching("third", scoring(70));
    let third_calls = Arc::clone(&third.calls);

    let orchestrator = orchestrator(vec![
        Arc::new(ScriptedAdapter::matching("first", scoring(40))),
        Arc::new(ScriptedAdapter::matching("second", scoring(96))),
        Arc::new(third),
    ]);

    let result = orchestrator.reconcile(&input()).await;

    assert_eq!(result.winner.as_deref(), Some("second"));
    assert_close(result.best_score, 96.0);
    assert_eq!(result.status, Classification::MatchConfirmed);
    assert_eq!(result.termination, Termination::EarlyStop);
    assert_eq!(result.candidates.len(), 2);
    assert_close(result.candidates[0].base_score, 40.0);
    assert_eq!(third_calls.load(Ordering::SeqCst), 0);
}

// ================================================================================================
// Failure isolation
// ================================================================================================

#[tokio::test]
async fn failure_then_success_records_audit_entry() {
    let orchestrator = orchestrator(vec![
        Arc::new(ScriptedAdapter::new("broken", Reply::Fail)),
        Arc::new(ScriptedAdapter::matching("backup", scoring(85))),
    ]);

    let result = orchestrator.reconcile(&input()).await;

    assert_eq!(result.winner.as_deref(), Some("backup"));
    assert_close(result.best_score, 85.0);
    assert_eq!(result.status, Classification::MatchLikely);
    assert_eq!(result.termination, Termination::Exhausted);

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].source, "broken");
    assert_eq!(result.failures[0].kind, FailureKind::Transport);
    assert!(result.failures[0].error.contains("connection refused"));
}

#[tokio::test]
async fn timeout_counts_as_failure() {
    let options = OrchestratorOptions {
        adapter_timeout: Duration::from_millis(50),
        ..OrchestratorOptions::default()
    };
    let orchestrator = ReconciliationOrchestrator::new(
        vec![
            Arc::new(ScriptedAdapter::new("sluggish", Reply::Sleep(Duration::from_secs(5)))),
            Arc::new(LocalAdapter),
        ],
        options,
    );

    let result = orchestrator.reconcile("Rua Augusta 500").await;

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].kind, FailureKind::Timeout);
    assert_eq!(result.winner.as_deref(), Some("local"));
    assert_eq!(result.status, Classification::MatchConfirmed);
}

#[tokio::test]
async fn panicking_adapter_is_isolated() {
    let orchestrator = orchestrator(vec![
        Arc::new(ScriptedAdapter::new("explosive", Reply::Panic)),
        Arc::new(LocalAdapter),
    ]);

    let result = orchestrator.reconcile("Rua Augusta 500").await;

    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].kind, FailureKind::Internal);
    assert!(result.failures[0].error.contains("scripted adapter panic"));
    assert_eq!(result.winner.as_deref(), Some("local"));
}

#[tokio::test]
async fn all_adapters_failing_is_no_match() {
    let orchestrator = orchestrator(vec![
        Arc::new(ScriptedAdapter::new("a", Reply::Fail)),
        Arc::new(ScriptedAdapter::new("b", Reply::Fail)),
    ]);

    let result = orchestrator.reconcile("Rua Augusta 500").await;

    assert!(result.winner.is_none());
    assert_eq!(result.best_score, 0.0);
    assert_eq!(result.status, Classification::NoMatch);
    assert_eq!(result.failures.len(), 2);
    assert!(result.winning_candidate().is_none());
}

// ================================================================================================
// Selection rules
// ================================================================================================

#[tokio::test]
async fn tie_goes_to_later_adapter() {
    let orchestrator = orchestrator(vec![
        Arc::new(ScriptedAdapter::matching("earlier", scoring(75))),
        Arc::new(ScriptedAdapter::matching("later", scoring(75))),
    ]);

    let result = orchestrator.reconcile(&input()).await;

    assert_eq!(result.winner.as_deref(), Some("later"));
    assert_eq!(result.status, Classification::MatchPossible);
    let winning = result.winning_candidate().unwrap();
    assert_eq!(winning.source, "later");
}

#[tokio::test]
async fn reported_score_is_audit_only() {
    let orchestrator = orchestrator(vec![Arc::new(ScriptedAdapter::matching("only", scoring(60)))]);

    let result = orchestrator.reconcile(&input()).await;

    let candidate = &result.candidates[0];
    assert_eq!(candidate.reported_score, Some(1.0));
    assert_close(candidate.adjusted_score, 60.0);
    assert_eq!(result.status, Classification::MatchUndefined);
}

#[tokio::test]
async fn matching_postal_code_boosts_score() {
    let raw = format!("{} 01310-100", input());
    let matched = format!("{} 99999-999", scoring(60));
    let orchestrator = orchestrator(vec![Arc::new(ScriptedAdapter::new(
        "with-cep",
        Reply::Match {
            text: matched,
            cep: Some("01310100"),
        },
    ))]);

    let result = orchestrator.reconcile(&raw).await;
    let candidate = &result.candidates[0];

    assert!(candidate.was_boosted());
    let expected = candidate.base_score + POSTAL_CODE_MAX_BOOST * (1.0 - candidate.base_score / 100.0);
    assert_close(candidate.adjusted_score, expected);
    assert_close(result.best_score, candidate.adjusted_score);
    assert_eq!(candidate.postal_code.as_ref().unwrap().as_str(), "01310100");
}

#[tokio::test]
async fn differing_postal_code_leaves_score_unchanged() {
    let raw = format!("{} 01310-100", input());
    let orchestrator = orchestrator(vec![Arc::new(ScriptedAdapter::new(
        "other-cep",
        Reply::Match {
            text: scoring(60),
            cep: Some("20040-002"),
        },
    ))]);

    let result = orchestrator.reconcile(&raw).await;
    let candidate = &result.candidates[0];

    assert!(!candidate.was_boosted());
    assert_close(candidate.adjusted_score, candidate.base_score);
}

#[tokio::test]
async fn no_adapters_configured() {
    let result = orchestrator(Vec::new()).reconcile("Rua A 1").await;

    assert!(result.winner.is_none());
    assert_eq!(result.status, Classification::NoMatch);
    assert_eq!(result.normalized, "rua a 1");
}

// "r." normalizes to "r", two deletions short of "rua" in 50 characters
#[tokio::test]
async fn dummy_abbreviation_stops_before_local() {
    let local = ScriptedAdapter::matching("local", "esquina da rua augusta 500".to_string());
    let local_calls = Arc::clone(&local.calls);

    let orchestrator = orchestrator(vec![Arc::new(DummyAdapter), Arc::new(local)]);
    let result = orchestrator.reconcile("Esquina da Rua Augusta 500").await;

    assert_eq!(result.winner.as_deref(), Some("dummy"));
    assert_close(result.best_score, 96.0);
    assert_eq!(result.termination, Termination::EarlyStop);
    assert_eq!(result.status, Classification::MatchConfirmed);
    assert_eq!(local_calls.load(Ordering::SeqCst), 0);
}

// ================================================================================================
// Audit events
// ================================================================================================

#[tokio::test]
async fn event_bus_receives_failure_and_result() {
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();

    let orchestrator = ReconciliationOrchestrator::new(
        vec![
            Arc::new(ScriptedAdapter::new("broken", Reply::Fail)),
            Arc::new(LocalAdapter),
        ],
        OrchestratorOptions::default().with_event_bus(bus),
    );

    let result = orchestrator.reconcile("Rua Augusta 500").await;

    match rx.try_recv().unwrap() {
        ReconEvent::AdapterFailed { source, address, .. } => {
            assert_eq!(source, "broken");
            assert_eq!(address, "Rua Augusta 500");
        }
        other => panic!("unexpected event: {:?}", other),
    }
    match rx.try_recv().unwrap() {
        ReconEvent::AddressReconciled { id, winner, status, .. } => {
            assert_eq!(id, result.id);
            assert_eq!(winner.as_deref(), Some("local"));
            assert_eq!(status, "MATCH_CONFIRMED");
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

// ================================================================================================
// Batches
// ================================================================================================

#[tokio::test]
async fn batch_preserves_input_order() {
    let orchestrator = orchestrator(vec![Arc::new(SelectiveSleepAdapter)]);
    let addresses: Vec<String> = (1..=8).map(|n| format!("Rua {} {}", n, n * 10)).collect();

    let outcome = reconcile_batch(&orchestrator, addresses.clone(), 3, &CancellationToken::new()).await;

    let raws: Vec<String> = outcome.results.iter().map(|r| r.raw.clone()).collect();
    assert_eq!(raws, addresses);
    assert_eq!(outcome.completed, 8);
    assert_eq!(outcome.cancelled, 0);
}

#[tokio::test]
async fn batch_cancellation_keeps_finished_results() {
    let options = OrchestratorOptions {
        adapter_timeout: Duration::from_secs(60),
        ..OrchestratorOptions::default()
    };
    let bus = EventBus::new(16);
    let mut rx = bus.subscribe();
    let orchestrator =
        ReconciliationOrchestrator::new(vec![Arc::new(SelectiveSleepAdapter)], options.with_event_bus(bus));

    let addresses = vec![
        "Rua Rapida 1".to_string(),
        "Rua slow 2".to_string(),
        "Rua Rapida 3".to_string(),
    ];

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let outcome = reconcile_batch(&orchestrator, addresses, 2, &cancel).await;

    let raws: Vec<&str> = outcome.results.iter().map(|r| r.raw.as_str()).collect();
    assert_eq!(raws, vec!["Rua Rapida 1", "Rua Rapida 3"]);
    assert_eq!(outcome.completed, 2);
    assert_eq!(outcome.cancelled, 1);

    // Two AddressReconciled events, then the batch summary
    let mut batch_event = None;
    while let Ok(event) = rx.try_recv() {
        if let ReconEvent::BatchCompleted { completed, cancelled, .. } = event {
            batch_event = Some((completed, cancelled));
        }
    }
    assert_eq!(batch_event, Some((2, 1)));
}
