//! Adapter registry: builds the active adapter list from configured names

use geomatch_common::EngineConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::viacep::VIACEP_BASE_URL;
use super::{AdapterError, DummyAdapter, LocalAdapter, SourceAdapter, ViaCepAdapter};

/// Adapter names understood by [`from_names`]
pub const KNOWN_ADAPTERS: [&str; 3] = ["local", "dummy", "viacep"];

/// ViaCEP public usage guidance: keep to a few requests per second
const VIACEP_REQUESTS_PER_SECOND: u32 = 3;

/// Settings shared by network-backed adapters
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterSettings {
    pub viacep_base_url: String,
    /// HTTP client timeout; the orchestrator applies its own per-call timeout on top
    pub http_timeout: Duration,
    pub viacep_requests_per_second: u32,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            viacep_base_url: VIACEP_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(5),
            viacep_requests_per_second: VIACEP_REQUESTS_PER_SECOND,
        }
    }
}

impl AdapterSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            viacep_base_url: config.viacep_base_url.clone(),
            http_timeout: config.adapter_timeout(),
            ..Self::default()
        }
    }
}

pub fn known_names() -> &'static [&'static str] {
    &KNOWN_ADAPTERS
}

/// Build adapters for `names`, preserving order
///
/// Names are matched case-insensitively after trimming. Unknown names are
/// logged and skipped, so the result may be shorter than `names` (or empty).
///
/// # Errors
/// Only if a network adapter's HTTP client cannot be constructed.
pub fn from_names(
    names: &[String],
    settings: &AdapterSettings,
) -> Result<Vec<Arc<dyn SourceAdapter>>, AdapterError> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(names.len());

    for name in names {
        let adapter: Arc<dyn SourceAdapter> = match name.trim().to_ascii_lowercase().as_str() {
            "local" => Arc::new(LocalAdapter),
            "dummy" => Arc::new(DummyAdapter),
            "viacep" => Arc::new(ViaCepAdapter::new(
                settings.viacep_base_url.clone(),
                settings.http_timeout,
                settings.viacep_requests_per_second,
            )?),
            _ => {
                warn!(provider = %name, known = ?KNOWN_ADAPTERS, "Unknown provider, skipping");
                continue;
            }
        };
        adapters.push(adapter);
    }

    debug!(
        adapters = ?adapters.iter().map(|a| a.name()).collect::<Vec<_>>(),
        "Adapters configured"
    );
    Ok(adapters)
}
