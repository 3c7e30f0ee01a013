//! Address text normalization
//!
//! Canonicalizes an address for comparison:
//! 1. lowercase
//! 2. trim
//! 3. NFKD-decompose and drop non-ASCII (accents fold to base letters, `º` to `o`)
//! 4. remove hyphens without inserting a space (`12345-678` → `12345678`)
//! 5. replace everything outside `[a-z0-9\s]` with a space
//! 6. collapse whitespace runs and trim
//!
//! The result is idempotent: `normalize(normalize(x)) == normalize(x)`.

use unicode_normalization::UnicodeNormalization;

use crate::models::NormalizedAddress;

/// Normalize an address string for comparison
pub fn normalize(text: &str) -> NormalizedAddress {
    let lowered = text.to_lowercase();

    let folded: String = lowered
        .trim()
        .nfkd()
        .filter(char::is_ascii)
        .filter(|c| *c != '-')
        .map(|c| {
            // Uppercase produced by the decomposition (`№` → `No`) is not kept
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    NormalizedAddress::from_canonical(folded.split_whitespace().collect::<Vec<_>>().join(" "))
}
