//! Reqwest-based HTTP client for the provider's embedded-designer API.
//!
//! The funnel only talks to the provider for one thing: issuing an
//! editor-embedding nonce. The call is blocking with a bounded timeout;
//! a timeout is an upstream-availability problem, never evidence that no
//! nonce exists.

use crate::errors::PrintgateError;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

/// Default provider API base URL.
pub const PROVIDER_BASE_URL: &str = "https://api.printful.com";

/// Bound on every provider call.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// A nonce issued by the provider for embedding the design editor.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderNonce {
    /// The nonce value.
    pub nonce: String,
    /// Expiry reported by the provider, when present.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Wire shape of the provider's nonce response.
#[derive(Debug, Deserialize)]
struct NonceEnvelope {
    result: NonceBody,
}

#[derive(Debug, Deserialize)]
struct NonceBody {
    nonce: String,
    #[serde(default)]
    expires_at: Option<i64>,
}

/// Provider API client.
pub struct ProviderClient {
    client: Client,
    token: String,
    base_url: String,
}

impl ProviderClient {
    /// Create a client authenticated with the given API token.
    pub fn new(token: &str) -> Result<Self, PrintgateError> {
        let client = Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| {
                PrintgateError::UpstreamUnavailable(format!("failed to create client: {e}"))
            })?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: PROVIDER_BASE_URL.to_string(),
        })
    }

    /// Create a client pointed at a custom base URL (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, PrintgateError> {
        let mut client = Self::new(token)?;
        client.base_url = base_url.trim_end_matches('/').to_string();
        Ok(client)
    }

    /// Issue an embedded-designer nonce for an external product.
    ///
    /// # Errors
    /// `UpstreamUnavailable` on transport failure, timeout, non-success
    /// status, or a response that does not match the expected shape.
    pub fn issue_nonce(
        &self,
        external_product_id: &str,
        external_customer_id: Option<&str>,
    ) -> Result<ProviderNonce, PrintgateError> {
        let url = format!("{}/embedded-designer/nonces", self.base_url);

        let mut body = serde_json::json!({
            "external_product_id": external_product_id,
        });
        if let Some(customer) = external_customer_id {
            body["external_customer_id"] = serde_json::Value::String(customer.to_string());
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|e| {
                PrintgateError::UpstreamUnavailable(format!("nonce request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PrintgateError::UpstreamUnavailable(format!(
                "nonce endpoint returned {status}"
            )));
        }

        let envelope: NonceEnvelope = response.json().map_err(|e| {
            PrintgateError::UpstreamUnavailable(format!("unexpected nonce response shape: {e}"))
        })?;

        Ok(ProviderNonce {
            nonce: envelope.result.nonce,
            expires_at: envelope
                .result
                .expires_at
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
