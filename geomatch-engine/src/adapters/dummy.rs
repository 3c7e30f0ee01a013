//! Simulated external provider
//!
//! Mimics a remote source that answers with a slightly different spelling:
//! the normalized input with an inner ` rua ` token abbreviated to ` r. `.

use async_trait::async_trait;

use super::{AdapterError, AdapterResponse, SourceAdapter};
use crate::matching::{normalize, score};

pub struct DummyAdapter;

#[async_trait]
impl SourceAdapter for DummyAdapter {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn validate(&self, raw_address: &str) -> Result<AdapterResponse, AdapterError> {
        let normalized = normalize(raw_address);
        let suggestion = normalized.as_str().replace(" rua ", " r. ");
        let similarity = score(normalized.as_str(), &suggestion);

        Ok(AdapterResponse::new(suggestion)
            .with_score(similarity)
            .with_metadata("source", "dummy"))
    }
}
