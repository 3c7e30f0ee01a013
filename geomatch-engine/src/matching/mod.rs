//! Address matching primitives
//!
//! Pure, total functions: normalization, postal code handling, similarity
//! scoring and score classification. Nothing here performs I/O or fails.

pub mod classify;
pub mod normalizer;
pub mod postal_code;
pub mod similarity;

pub use classify::{classify, Classification, UnknownClassification};
pub use normalizer::normalize;
pub use postal_code::{
    extract_postal_code, normalize_postal_code, validate_address_components,
    validate_postal_code, validate_uf, AddressComponents, ComponentIssue,
};
pub use similarity::{score, score_with_postal_code, POSTAL_CODE_MAX_BOOST};

use serde::Serialize;

use crate::models::NormalizedAddress;

/// Score of one input/matched pair, with both normalized forms
#[derive(Debug, Clone, Serialize)]
pub struct MatchScore {
    pub normalized_input: NormalizedAddress,
    pub normalized_matched: NormalizedAddress,
    pub score: f64,
    pub classification: Classification,
}

/// Normalize both addresses, score them and classify the score
pub fn calculate_match_score(input: &str, matched: &str) -> MatchScore {
    let normalized_input = normalize(input);
    let normalized_matched = normalize(matched);
    let score = score(normalized_input.as_str(), normalized_matched.as_str());

    MatchScore {
        normalized_input,
        normalized_matched,
        score,
        classification: classify(score),
    }
}
