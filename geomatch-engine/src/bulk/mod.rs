//! Bulk address extraction
//!
//! Pulls raw address strings out of bulk uploads:
//! - **tabular**: CSV with a recognized address column
//! - **sql**: ad-hoc `INSERT INTO ... VALUES (...)` dumps, with a quoted-literal fallback
//!
//! Both errors here describe malformed input; callers surface them unchanged.

pub mod sql;
pub mod tabular;

pub use sql::extract_sql;
pub use tabular::{extract_tabular, ADDRESS_HEADERS};

use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::models::RawAddress;

/// Bulk extraction error
#[derive(Debug, Error)]
pub enum BulkError {
    /// No recognized address column in the header row
    #[error("address column not found (expected one of {expected:?}, found {found:?})")]
    Schema {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Neither INSERT parsing nor the literal fallback produced an address
    #[error("no addresses could be extracted from the input")]
    NoAddressesFound,

    /// File extension is neither .csv nor .sql
    #[error("unsupported file format: {0} (expected .csv or .sql)")]
    UnsupportedFormat(String),

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Input file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported bulk input shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkFormat {
    Csv,
    Sql,
}

impl BulkFormat {
    /// Detect the format from a file name's extension (case-insensitive)
    pub fn from_file_name(file_name: &str) -> Result<Self, BulkError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("sql") => Ok(Self::Sql),
            _ => Err(BulkError::UnsupportedFormat(file_name.to_string())),
        }
    }
}

/// Extract addresses from an uploaded file's bytes, dispatching on its name
///
/// SQL content is decoded as UTF-8, replacing invalid sequences.
pub fn extract_auto(file_name: &str, content: &[u8]) -> Result<Vec<RawAddress>, BulkError> {
    let addresses = match BulkFormat::from_file_name(file_name)? {
        BulkFormat::Csv => extract_tabular(content)?,
        BulkFormat::Sql => extract_sql(&String::from_utf8_lossy(content))?,
    };

    info!(file = file_name, rows = addresses.len(), "Extracted bulk addresses");
    Ok(addresses)
}

/// Read a `.csv` or `.sql` file from disk and extract its addresses
pub fn extract_file(path: &Path) -> Result<Vec<RawAddress>, BulkError> {
    let file_name = path.to_string_lossy().to_string();
    // Check the extension before touching the file
    BulkFormat::from_file_name(&file_name)?;
    let content = std::fs::read(path)?;
    extract_auto(&file_name, &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(BulkFormat::from_file_name("in.csv").unwrap(), BulkFormat::Csv);
        assert_eq!(BulkFormat::from_file_name("DUMP.SQL").unwrap(), BulkFormat::Sql);
        assert!(matches!(
            BulkFormat::from_file_name("addresses.xlsx"),
            Err(BulkError::UnsupportedFormat(_))
        ));
        assert!(BulkFormat::from_file_name("noext").is_err());
    }

    #[test]
    fn test_extract_auto_dispatches() {
        let csv = b"id,address\n1,Rua A 10\n";
        assert_eq!(extract_auto("a.csv", csv).unwrap(), vec!["Rua A 10"]);

        let sql = b"INSERT INTO t(address) VALUES ('Rua B, 20');";
        assert_eq!(extract_auto("b.sql", sql).unwrap(), vec!["Rua B, 20"]);
    }

    #[test]
    fn test_extract_auto_sql_tolerates_invalid_utf8() {
        let mut sql = b"INSERT INTO t VALUES ('Rua C 30', '".to_vec();
        sql.extend_from_slice(&[0xff, 0xfe]);
        sql.extend_from_slice(b"');");
        assert_eq!(extract_auto("c.sql", &sql).unwrap(), vec!["Rua C 30"]);
    }
}
