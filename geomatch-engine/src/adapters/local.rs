//! Local canonicalization adapter
//!
//! Answers with the normalized input itself at full confidence. Useful as a
//! baseline source and for offline runs.

use async_trait::async_trait;

use super::{AdapterError, AdapterResponse, SourceAdapter};
use crate::matching::normalize;

pub struct LocalAdapter;

#[async_trait]
impl SourceAdapter for LocalAdapter {
    fn name(&self) -> &str {
        "local"
    }

    async fn validate(&self, raw_address: &str) -> Result<AdapterResponse, AdapterError> {
        Ok(AdapterResponse::new(normalize(raw_address).into_string())
            .with_score(100.0)
            .with_metadata("source", "local"))
    }
}
