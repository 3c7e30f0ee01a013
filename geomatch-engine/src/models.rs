//! Reconciliation data model
//!
//! Input strings flow in as [`RawAddress`]; everything the engine derives from
//! them is built once and not mutated afterwards. Result types serialize to
//! JSON for the persistence/export collaborators that consume them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::matching::Classification;

/// Opaque input address, as supplied by a caller or a bulk extractor
pub type RawAddress = String;

/// Free-form adapter metadata (string keys to arbitrary JSON values)
pub type Metadata = Map<String, Value>;

// ============================================================================
// Derived strings
// ============================================================================

/// Canonical comparison form of an address
///
/// Only [`crate::matching::normalize`] builds these, so the value is always
/// lowercase ASCII `[a-z0-9]` tokens separated by single spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct NormalizedAddress(String);

impl NormalizedAddress {
    pub(crate) fn from_canonical(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for NormalizedAddress {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Digit-only postal code (CEP)
///
/// Built by [`crate::matching::normalize_postal_code`]; never contains
/// anything but ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    pub(crate) fn from_digits(digits: String) -> Self {
        debug_assert!(digits.bytes().all(|b| b.is_ascii_digit()));
        Self(digits)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `NNNNN-NNN` display form for eight-digit codes, digits unchanged otherwise
    pub fn formatted(&self) -> String {
        if self.0.len() == 8 {
            format!("{}-{}", &self.0[..5], &self.0[5..])
        } else {
            self.0.clone()
        }
    }
}

impl std::fmt::Display for PostalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Per-adapter results
// ============================================================================

/// One source adapter's scored answer for one input address
#[derive(Debug, Clone, Serialize)]
pub struct CandidateResult {
    /// Adapter name
    pub source: String,
    /// Matched address exactly as the adapter returned it
    pub matched_address: String,
    pub normalized_matched: NormalizedAddress,
    /// Candidate postal code (from the adapter's `cep` metadata)
    pub postal_code: Option<PostalCode>,
    /// Text similarity between normalized input and normalized match
    pub base_score: f64,
    /// Score after postal-code boosting; equals `base_score` when no boost applied
    pub adjusted_score: f64,
    /// Score the adapter computed itself, kept for audit only
    pub reported_score: Option<f64>,
    /// Classification of `adjusted_score`
    pub classification: Classification,
    pub metadata: Metadata,
}

impl CandidateResult {
    pub fn was_boosted(&self) -> bool {
        self.adjusted_score > self.base_score
    }
}

/// Broad category of an adapter failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Rejected,
    Transport,
    Malformed,
    /// Adapter panicked
    Internal,
}

/// Audit record of one failed adapter call
#[derive(Debug, Clone, Serialize)]
pub struct AdapterFailure {
    pub source: String,
    pub kind: FailureKind,
    pub error: String,
    pub occurred_at: DateTime<Utc>,
}

// ============================================================================
// Aggregate
// ============================================================================

/// Why adapter iteration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// A candidate reached the early-stop score; later adapters were skipped
    EarlyStop,
    /// Every configured adapter was tried
    Exhausted,
}

/// Final reconciliation result for one raw address
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledAddress {
    pub id: Uuid,
    pub raw: RawAddress,
    pub normalized: NormalizedAddress,
    /// Input postal code, digit-only
    pub postal_code: Option<PostalCode>,
    /// Successful candidates in adapter order
    pub candidates: Vec<CandidateResult>,
    /// Failed adapters in adapter order
    pub failures: Vec<AdapterFailure>,
    /// Name of the winning adapter (`None` when nothing succeeded)
    pub winner: Option<String>,
    pub best_score: f64,
    pub status: Classification,
    pub termination: Termination,
}

impl ReconciledAddress {
    /// Candidate produced by the winning adapter
    pub fn winning_candidate(&self) -> Option<&CandidateResult> {
        let winner = self.winner.as_deref()?;
        // Ties go to the later adapter, so search from the back
        self.candidates
            .iter()
            .rev()
            .find(|c| c.source == winner && c.adjusted_score == self.best_score)
    }
}
