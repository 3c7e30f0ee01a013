//! ViaCEP postal code lookup
//!
//! Resolves the CEP found in the input address through the public ViaCEP
//! web service and answers with the street/district/city/state it returns.
//!
//! API Documentation: https://viacep.com.br

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

use super::{AdapterError, AdapterResponse, SourceAdapter};
use crate::matching::{calculate_match_score, extract_postal_code, normalize_postal_code};

const USER_AGENT: &str = concat!("geomatch/", env!("CARGO_PKG_VERSION"));

/// Default public endpoint
pub const VIACEP_BASE_URL: &str = "https://viacep.com.br";

/// ViaCEP `/ws/{cep}/json/` body
///
/// Unknown postal codes come back as `{"erro": true}` with status 200, which
/// is checked before this struct is decoded.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViaCepAddress {
    logradouro: String,
    complemento: String,
    bairro: String,
    localidade: String,
    uf: String,
    ibge: String,
    ddd: String,
}

impl ViaCepAddress {
    /// `logradouro, bairro, localidade, uf`, blank parts omitted
    fn display_line(&self) -> String {
        [&self.logradouro, &self.bairro, &self.localidade, &self.uf]
            .iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

pub struct ViaCepAdapter {
    client: Client,
    base_url: String,
    timeout: Duration,
    /// Outbound request limiter shared by all concurrent reconciliations
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl ViaCepAdapter {
    /// Build a client against `base_url` (no trailing `/ws`)
    ///
    /// `requests_per_second` of 0 is treated as 1.
    ///
    /// # Errors
    /// `AdapterError::Transport` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        requests_per_second: u32,
    ) -> Result<Self, AdapterError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    async fn fetch(&self, cep: &str) -> Result<Value, AdapterError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/ws/{}/json/", self.base_url, cep);
        debug!(cep = %cep, url = %url, "Querying ViaCEP");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout(self.timeout)
            } else {
                AdapterError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Transport(format!("HTTP {}", status)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AdapterError::Malformed(e.to_string()))
    }
}

/// `"erro": true` (or the string `"true"`, seen on older deployments)
fn is_not_found(body: &Value) -> bool {
    match body.get("erro") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[async_trait]
impl SourceAdapter for ViaCepAdapter {
    fn name(&self) -> &str {
        "viacep"
    }

    async fn validate(&self, raw_address: &str) -> Result<AdapterResponse, AdapterError> {
        let cep = extract_postal_code(raw_address)
            .map(|code| normalize_postal_code(&code))
            .ok_or_else(|| AdapterError::Rejected("postal code not found in address".to_string()))?;

        let body = self.fetch(cep.as_str()).await?;
        if is_not_found(&body) {
            return Err(AdapterError::Rejected(format!("postal code {} not found", cep.formatted())));
        }

        let address: ViaCepAddress =
            serde_json::from_value(body).map_err(|e| AdapterError::Malformed(e.to_string()))?;

        let matched = address.display_line();
        let similarity = calculate_match_score(raw_address, &matched).score;

        Ok(AdapterResponse::new(matched)
            .with_score(similarity)
            .with_metadata("source", "viacep")
            .with_metadata("cep", cep.as_str())
            .with_metadata("cep_formatted", cep.formatted())
            .with_metadata("logradouro", address.logradouro)
            .with_metadata("complemento", address.complemento)
            .with_metadata("bairro", address.bairro)
            .with_metadata("localidade", address.localidade)
            .with_metadata("uf", address.uf)
            .with_metadata("ibge", address.ibge)
            .with_metadata("ddd", address.ddd))
    }
}
