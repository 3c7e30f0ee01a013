//! Pseudo-SQL address extraction
//!
//! Accepts ad-hoc dumps of `INSERT INTO <anything> VALUES (...)` statements
//! (keywords case-insensitive, trailing semicolon optional). Each value tuple
//! is one row; the row's address is its first quoted literal that contains at
//! least one letter and one digit. When no statement yields an address, every
//! quoted literal in the text passing the same test is taken instead.
//!
//! Quoting: `'...'` with `''` or `\'` escapes, `"..."` with `""` or `\"` escapes.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::BulkError;
use crate::models::RawAddress;

/// Matches up to and including the `(` that opens the first value tuple
static INSERT_VALUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bINSERT\s+INTO\s+[^;]*?\bVALUES\s*\(").expect("INSERT pattern is valid")
});

/// Extract addresses from pseudo-SQL text
///
/// # Errors
/// `BulkError::NoAddressesFound` if neither the INSERT pass nor the fallback
/// finds an address.
pub fn extract_sql(text: &str) -> Result<Vec<RawAddress>, BulkError> {
    let mut addresses = extract_from_inserts(text);

    if addresses.is_empty() {
        debug!("No address in INSERT statements, scanning all quoted literals");
        addresses = scan_literals(text, 0, text.len())
            .into_iter()
            .filter(|lit| looks_like_address(lit))
            .collect();
    }

    if addresses.is_empty() {
        return Err(BulkError::NoAddressesFound);
    }
    Ok(addresses)
}

/// One address per value tuple of every INSERT statement
fn extract_from_inserts(text: &str) -> Vec<RawAddress> {
    let mut addresses = Vec::new();
    let mut pos = 0;

    while let Some(m) = INSERT_VALUES.find_at(text, pos) {
        // `m.end()` is just past the opening parenthesis
        let mut open = m.end() - 1;
        pos = m.end();

        loop {
            let Some(tuple_end) = find_tuple_end(text, open) else {
                break;
            };
            let row = scan_literals(text, open + 1, tuple_end);
            if let Some(address) = row.into_iter().find(|lit| looks_like_address(lit)) {
                addresses.push(address);
            }
            pos = tuple_end + 1;

            // `VALUES (...), (...)` continues with another tuple
            match next_tuple_start(text, pos) {
                Some(next_open) => open = next_open,
                None => break,
            }
        }
    }

    addresses
}

/// Index of the `)` closing the tuple opened at `open`, skipping quoted text
/// and nested parentheses. `None` if the tuple never closes.
fn find_tuple_end(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;

    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            b'\'' | b'"' => {
                let (_, after) = read_quoted(text, i)?;
                i = after;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// After a tuple: optional whitespace, a comma, optional whitespace, `(`
fn next_tuple_start(text: &str, from: usize) -> Option<usize> {
    let rest = &text[from..];
    let after_comma = rest.trim_start().strip_prefix(',')?;
    let after_ws = after_comma.trim_start();
    if after_ws.starts_with('(') {
        Some(text.len() - after_ws.len())
    } else {
        None
    }
}

/// Every quoted literal in `text[start..end]`, unescaped, in order
///
/// An unterminated quote is skipped and scanning resumes after it.
fn scan_literals(text: &str, start: usize, end: usize) -> Vec<String> {
    let region = &text[..end];
    let bytes = region.as_bytes();
    let mut literals = Vec::new();
    let mut i = start;

    while i < bytes.len() {
        if bytes[i] == b'\'' || bytes[i] == b'"' {
            if let Some((value, after)) = read_quoted(region, i) {
                literals.push(value);
                i = after;
                continue;
            }
        }
        i += 1;
    }
    literals
}

/// Read the literal opening at `open`; returns the unescaped value and the
/// index just past the closing quote
fn read_quoted(text: &str, open: usize) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    let quote = bytes[open];
    let mut value = String::new();
    let mut segment_start = open + 1;
    let mut i = open + 1;

    while i < bytes.len() {
        let b = bytes[i];
        let next_is_quote = bytes.get(i + 1) == Some(&quote);

        if (b == b'\\' || b == quote) && next_is_quote {
            // Escaped quote: `\'` / `''` (or the double-quote equivalents)
            value.push_str(&text[segment_start..i]);
            value.push(quote as char);
            i += 2;
            segment_start = i;
            continue;
        }
        if b == quote {
            value.push_str(&text[segment_start..i]);
            return Some((value, i + 1));
        }
        i += 1;
    }
    None
}

/// A real address has at least one letter and one digit
fn looks_like_address(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_alphabetic()) && value.chars().any(|c| c.is_ascii_digit())
}
