//! # GeoMatch Common Library
//!
//! Shared code for the GeoMatch reconciliation workspace:
//! - Error and result types
//! - Configuration resolution (CLI → ENV → TOML → defaults)
//! - Audit event types and the broadcast event bus
//! - Tracing subscriber setup

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use events::{EventBus, ReconEvent};
