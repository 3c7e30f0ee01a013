//! Common error types for GeoMatch

use thiserror::Error;

/// Common result type for GeoMatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the GeoMatch crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
