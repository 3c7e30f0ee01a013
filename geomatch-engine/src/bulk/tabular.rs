//! CSV address extraction

use std::io::Read;

use super::BulkError;
use crate::models::RawAddress;

/// Header names recognized as the address column (case-sensitive)
pub const ADDRESS_HEADERS: [&str; 4] = ["address", "endereco", "logradouro", "rua"];

/// Extract the address column from CSV input
///
/// The first header, in the file's column order, that exactly matches one of
/// [`ADDRESS_HEADERS`] selects the column. Its values are returned in row
/// order; rows too short to reach the column yield an empty string.
///
/// # Errors
/// * `BulkError::Schema` if no header is recognized
/// * `BulkError::Csv` if the input is not valid CSV
pub fn extract_tabular<R: Read>(reader: R) -> Result<Vec<RawAddress>, BulkError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let column = headers
        .iter()
        .position(|h| ADDRESS_HEADERS.contains(&h.as_str()))
        .ok_or_else(|| BulkError::Schema {
            expected: ADDRESS_HEADERS.iter().map(|h| h.to_string()).collect(),
            found: headers.clone(),
        })?;

    let mut addresses = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        addresses.push(record.get(column).unwrap_or_default().to_string());
    }
    Ok(addresses)
}
