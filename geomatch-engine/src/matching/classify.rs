//! Score classification
//!
//! Five confidence tiers, lower bound inclusive. The label strings are a
//! stable contract for downstream reporting and export.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Confidence tier of a match score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// score >= 90
    MatchConfirmed,
    /// 80 <= score < 90
    MatchLikely,
    /// 70 <= score < 80
    MatchPossible,
    /// 50 <= score < 70
    MatchUndefined,
    /// score < 50
    NoMatch,
}

impl Classification {
    /// All tiers, most confident first
    pub const ALL: [Classification; 5] = [
        Self::MatchConfirmed,
        Self::MatchLikely,
        Self::MatchPossible,
        Self::MatchUndefined,
        Self::NoMatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MatchConfirmed => "MATCH_CONFIRMED",
            Self::MatchLikely => "MATCH_LIKELY",
            Self::MatchPossible => "MATCH_POSSIBLE",
            Self::MatchUndefined => "MATCH_UNDEFINED",
            Self::NoMatch => "NO_MATCH",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label that is not one of the five classification strings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown classification label: {0}")]
pub struct UnknownClassification(pub String);

impl FromStr for Classification {
    type Err = UnknownClassification;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownClassification(s.to_string()))
    }
}

/// Map a 0-100 score to its tier (NaN classifies as `NoMatch`)
pub fn classify(score: f64) -> Classification {
    if score >= 90.0 {
        Classification::MatchConfirmed
    } else if score >= 80.0 {
        Classification::MatchLikely
    } else if score >= 70.0 {
        Classification::MatchPossible
    } else if score >= 50.0 {
        Classification::MatchUndefined
    } else {
        Classification::NoMatch
    }
}
