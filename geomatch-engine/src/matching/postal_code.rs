//! Postal code (CEP) extraction and validation
//!
//! A Brazilian CEP is five digits, an optional hyphen, three digits. Equality
//! comparisons always use the digit-only form.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::PostalCode;

static CEP_SEARCH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{5}-?[0-9]{3}").expect("CEP search pattern is valid"));

static CEP_EXACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{5}-?[0-9]{3}$").expect("CEP exact pattern is valid"));

/// The 27 Brazilian federative units
const VALID_UFS: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA",
    "PB", "PR", "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

/// First CEP-shaped substring of `text`, verbatim (hyphen kept if present)
pub fn extract_postal_code(text: &str) -> Option<String> {
    CEP_SEARCH.find(text).map(|m| m.as_str().to_string())
}

/// Strip every non-digit character
pub fn normalize_postal_code(code: &str) -> PostalCode {
    PostalCode::from_digits(code.chars().filter(char::is_ascii_digit).collect())
}

/// True iff the trimmed input is exactly `NNNNN-NNN` or `NNNNNNNN`
pub fn validate_postal_code(code: &str) -> bool {
    CEP_EXACT.is_match(code.trim())
}

/// True iff `uf` is a two-letter Brazilian state code (case-insensitive)
pub fn validate_uf(uf: &str) -> bool {
    if uf.len() != 2 {
        return false;
    }
    let upper = uf.to_ascii_uppercase();
    VALID_UFS.contains(&upper.as_str())
}

/// Structured address components, as submitted by a form or import
#[derive(Debug, Clone, Default)]
pub struct AddressComponents {
    pub street: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
}

/// One problem found by [`validate_address_components`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentIssue {
    #[error("street is required")]
    MissingStreet,
    #[error("city is required")]
    MissingCity,
    #[error("invalid UF: {0}")]
    InvalidUf(String),
    #[error("invalid CEP: {0}")]
    InvalidPostalCode(String),
}

/// Check structured components; an empty list means valid
///
/// Street and city must be present and non-blank. UF and CEP are optional but
/// must be valid when given.
pub fn validate_address_components(components: &AddressComponents) -> Vec<ComponentIssue> {
    let mut issues = Vec::new();

    if is_blank(&components.street) {
        issues.push(ComponentIssue::MissingStreet);
    }
    if is_blank(&components.city) {
        issues.push(ComponentIssue::MissingCity);
    }
    if let Some(uf) = &components.uf {
        if !validate_uf(uf) {
            issues.push(ComponentIssue::InvalidUf(uf.clone()));
        }
    }
    if let Some(cep) = &components.cep {
        if !validate_postal_code(cep) {
            issues.push(ComponentIssue::InvalidPostalCode(cep.clone()));
        }
    }

    issues
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_first_match_verbatim() {
        assert_eq!(
            extract_postal_code("Av. Paulista, 1000 - 01310-100 São Paulo"),
            Some("01310-100".to_string())
        );
        assert_eq!(
            extract_postal_code("CEP 01310100 ou 04538-133"),
            Some("01310100".to_string())
        );
        assert_eq!(extract_postal_code("Rua A, 123"), None);
        assert_eq!(extract_postal_code(""), None);
    }

    #[test]
    fn test_normalize_strips_non_digits() {
        assert_eq!(normalize_postal_code("01310-100").as_str(), "01310100");
        assert_eq!(normalize_postal_code(" 01.310-100 ").as_str(), "01310100");
        assert_eq!(
            normalize_postal_code("01310-100"),
            normalize_postal_code("01310100")
        );
        assert!(normalize_postal_code("abc").is_empty());
    }

    #[test]
    fn test_validate_is_whole_string() {
        assert!(validate_postal_code("01310-100"));
        assert!(validate_postal_code("01310100"));
        assert!(validate_postal_code("  01310-100 "));
        assert!(!validate_postal_code("01310-1000"));
        assert!(!validate_postal_code("CEP 01310-100"));
        assert!(!validate_postal_code("0131-0100"));
        assert!(!validate_postal_code(""));
    }

    #[test]
    fn test_validate_uf() {
        assert!(validate_uf("SP"));
        assert!(validate_uf("rj"));
        assert!(!validate_uf("XX"));
        assert!(!validate_uf("SPA"));
        assert!(!validate_uf(""));
    }

    #[test]
    fn test_validate_components() {
        let valid = AddressComponents {
            street: Some("Av. Paulista".into()),
            city: Some("São Paulo".into()),
            uf: Some("SP".into()),
            cep: Some("01310-100".into()),
        };
        assert!(validate_address_components(&valid).is_empty());

        let invalid = AddressComponents {
            street: Some("  ".into()),
            city: None,
            uf: Some("ZZ".into()),
            cep: Some("123".into()),
        };
        assert_eq!(
            validate_address_components(&invalid),
            vec![
                ComponentIssue::MissingStreet,
                ComponentIssue::MissingCity,
                ComponentIssue::InvalidUf("ZZ".into()),
                ComponentIssue::InvalidPostalCode("123".into()),
            ]
        );
    }
}
