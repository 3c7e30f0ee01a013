//! Address similarity scoring
//!
//! Token-order-insensitive similarity on a 0-100 scale, with an optional
//! boost when both sides carry the same postal code.

use rapidfuzz::distance::indel;

use super::postal_code::normalize_postal_code;

/// Largest boost a postal code agreement can add (reached at base score 0)
pub const POSTAL_CODE_MAX_BOOST: f64 = 15.0;

/// Similarity of two addresses in `[0, 100]`
///
/// Both inputs are lowercased, their whitespace tokens sorted and re-joined,
/// then compared with the Indel ratio `1 - distance / (len_a + len_b)`, where
/// the distance counts single-character insertions and deletions. Identical
/// inputs (including two empty strings) score exactly 100.
pub fn score(a: &str, b: &str) -> f64 {
    let a = sorted_tokens(a);
    let b = sorted_tokens(b);
    if a == b {
        return 100.0;
    }

    let total = a.chars().count() + b.chars().count();
    let distance = indel::distance(a.chars(), b.chars());
    100.0 * (1.0 - distance as f64 / total as f64)
}

/// [`score`] plus a boost when both postal codes agree
///
/// When both codes are present and their digit-only forms are equal and
/// non-empty, `boost = 15 * (1 - base / 100)` is added and the result clamped
/// to 100. Absent or differing codes leave the base score unchanged.
pub fn score_with_postal_code(
    a: &str,
    b: &str,
    code_a: Option<&str>,
    code_b: Option<&str>,
) -> f64 {
    let base = score(a, b);

    let (Some(code_a), Some(code_b)) = (code_a, code_b) else {
        return base;
    };

    let digits_a = normalize_postal_code(code_a);
    let digits_b = normalize_postal_code(code_b);
    if digits_a.is_empty() || digits_a != digits_b {
        return base;
    }

    let boost = POSTAL_CODE_MAX_BOOST * (1.0 - base / 100.0);
    (base + boost).min(100.0)
}

fn sorted_tokens(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut tokens: Vec<&str> = lowered.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}
