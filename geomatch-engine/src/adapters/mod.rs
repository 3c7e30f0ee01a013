//! Source adapters
//!
//! A source adapter validates one raw address against some authority and
//! returns its best matching address. The orchestrator is the only caller and
//! treats every adapter failure as recoverable.
//!
//! # Adapters
//! 1. **local** - local canonicalization, always agrees with itself
//! 2. **dummy** - simulated external provider (street-type abbreviation)
//! 3. **viacep** - ViaCEP postal code lookup over HTTP

pub mod dummy;
pub mod local;
pub mod registry;
pub mod viacep;

pub use dummy::DummyAdapter;
pub use local::LocalAdapter;
pub use registry::{from_names, known_names, AdapterSettings};
pub use viacep::ViaCepAdapter;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::{FailureKind, Metadata};

/// Source adapter contract
///
/// # Example
/// ```rust,ignore
/// use geomatch_engine::adapters::{AdapterError, AdapterResponse, SourceAdapter};
///
/// struct Registry;
///
/// #[async_trait::async_trait]
/// impl SourceAdapter for Registry {
///     fn name(&self) -> &str { "registry" }
///
///     async fn validate(&self, raw_address: &str) -> Result<AdapterResponse, AdapterError> {
///         Ok(AdapterResponse::new(raw_address.to_uppercase()))
///     }
/// }
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Adapter identifier recorded on candidates and failures
    fn name(&self) -> &str;

    /// Validate/match one raw address
    ///
    /// # Errors
    /// Any `AdapterError`; the orchestrator records it and moves on.
    async fn validate(&self, raw_address: &str) -> Result<AdapterResponse, AdapterError>;
}

/// Successful adapter answer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterResponse {
    /// Best matching address text
    pub matched_address: String,
    /// Adapter's own similarity score, if it computes one
    pub score: Option<f64>,
    /// Free-form metadata; a string `cep` entry is used for postal code boosting
    pub metadata: Metadata,
}

impl AdapterResponse {
    pub fn new(matched_address: impl Into<String>) -> Self {
        Self {
            matched_address: matched_address.into(),
            score: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Adapter failure
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Business-rule rejection (e.g. no postal code in the input, unknown postal code)
    #[error("rejected: {0}")]
    Rejected(String),

    /// Network or HTTP-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Response could not be interpreted
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Call did not finish within the allotted time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Adapter panicked while validating
    #[error("adapter panicked: {0}")]
    Panicked(String),
}

impl AdapterError {
    /// Audit category for this failure
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Rejected(_) => FailureKind::Rejected,
            Self::Transport(_) => FailureKind::Transport,
            Self::Malformed(_) => FailureKind::Malformed,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::Panicked(_) => FailureKind::Internal,
        }
    }
}
