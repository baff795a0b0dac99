// src/rest_api/mod.rs

//! This module defines the core `RestClient` responsible for handling
//! generic HTTP REST API requests against the exchange's public market
//! data endpoints. All endpoints used by the pipeline are unsigned; the
//! typed wrappers live in `market_data`.

use crate::config::ApiConfig;
use crate::error::MarketError;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// REST client for public market data endpoints.
///
/// Owns a single `reqwest::Client` configured with the soft watchdog
/// timeout from `ApiConfig`; a request that neither resolves nor rejects
/// within that deadline fails with `MarketError::Timeout`.
#[derive(Debug, Clone)]
pub struct RestClient {
    http_client: Client,
    rest_base_url: String,
    request_timeout: Duration,
}

impl RestClient {
    /// Creates a new RestClient instance.
    ///
    /// # Arguments
    /// * `config` - Endpoint base URLs and the request timeout.
    pub fn new(config: &ApiConfig) -> Self {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http_client,
            rest_base_url: config.rest_base_url.clone(),
            request_timeout: config.request_timeout,
        }
    }

    /// Makes an unsigned GET request to the exchange REST API.
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint (e.g., "/ticker/24hr").
    /// * `params` - Query parameters as a vector of (key, value) tuples.
    ///
    /// # Returns
    /// A `Result` containing the parsed JSON `Value` on success. Non-2xx
    /// responses and transport failures map to `MarketError::Network`; the
    /// watchdog deadline maps to `MarketError::Timeout`.
    pub async fn get_unsigned_rest_request(
        &self,
        endpoint: &str,
        params: Vec<(&str, &str)>,
    ) -> Result<Value, MarketError> {
        let mut url = Url::parse(&format!("{}{}", self.rest_base_url, endpoint))
            .map_err(|e| MarketError::Validation(format!("failed to parse URL: {}", e)))?;

        let query_pairs: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        if !query_pairs.is_empty() {
            url.set_query(Some(&query_pairs.join("&")));
        }

        debug!("Unsigned REST GET request URL: {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MarketError::Timeout(self.request_timeout)
                } else {
                    MarketError::Network(format!("failed to send REST GET request: {}", e))
                }
            })?;

        if response.status().is_success() {
            response
                .json::<Value>()
                .await
                .map_err(|e| MarketError::Parse(format!("failed to parse JSON REST response: {}", e)))
        } else {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "No response body".to_string());
            Err(MarketError::Network(format!(
                "REST API GET request failed with status {}: {}",
                status, text
            )))
        }
    }
}
