//! Reusable HTTP client bound to one Hourglass deployment.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{redirect, Client};
use std::time::Duration;

use super::types::{ConnectionReport, ResourceQuery, UpstreamResponse};
use crate::config::{ConfigError, UpstreamConfig};
use crate::error::{Error, Result};

/// Header carrying the Hourglass API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Path of the resources endpoint, relative to the base URL.
pub const RESOURCES_PATH: &str = "/api/resources";

/// Upper bound for establishing a TCP/TLS connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum redirect hops when redirects are followed.
const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct HourglassClient {
    http: Client,
    base_url: String,
    has_api_key: bool,
}

impl HourglassClient {
    /// Build the client from upstream settings.
    ///
    /// Every request carries `Content-Type: application/json` and, when a key
    /// is configured, `X-Api-Key` (marked sensitive so it is never logged).
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(api_key.expose_secret()).map_err(|_| {
                ConfigError::Validation(
                    "upstream.api_key contains characters not allowed in an HTTP header"
                        .to_string(),
                )
            })?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
        }

        let redirect_policy = if config.follow_redirects {
            redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            redirect::Policy::none()
        };

        let timeout = Duration::from_secs(config.timeout_secs);
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .redirect(redirect_policy)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            has_api_key: config.api_key.is_some(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.has_api_key
    }

    /// Full URL of the resources endpoint.
    pub fn resources_url(&self) -> String {
        format!("{}{}", self.base_url, RESOURCES_PATH)
    }

    /// Fetch resources with the given filters.
    ///
    /// One upstream call per invocation. Non-2xx answers become
    /// [`Error::UpstreamStatus`] carrying the upstream body (JSON, or the raw
    /// text wrapped as `{"detail": text}`). Transport failures become
    /// [`Error::Unavailable`].
    pub async fn get_resources(&self, query: &ResourceQuery) -> Result<UpstreamResponse> {
        let url = self.resources_url();
        let params = query.upstream_params();

        tracing::info!(url = %url, params = ?params, "Forwarding resource request to Hourglass");

        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "Failed to reach Hourglass");
                Error::Unavailable(e.to_string())
            })?;

        let status = response.status();
        tracing::info!(status = %status, "Hourglass responded");
        tracing::debug!(headers = ?response.headers(), "Hourglass response headers");

        if !status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, status = %status, "Failed to read Hourglass error body");
                    String::new()
                }
            };
            tracing::error!(status = %status, body = %text, "Hourglass returned error");
            let detail = serde_json::from_str(&text)
                .unwrap_or_else(|_| serde_json::json!({ "detail": text }));
            return Err(Error::UpstreamStatus { status, detail });
        }

        let body = response.json::<serde_json::Value>().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Hourglass response");
            Error::Internal(e.to_string())
        })?;

        Ok(UpstreamResponse { status, body })
    }

    /// Verify the key and connectivity with an unfiltered resources call.
    ///
    /// Never fails: every outcome is folded into the report.
    pub async fn check_connection(&self) -> ConnectionReport {
        if !self.has_api_key {
            return ConnectionReport::error("API key not configured");
        }

        let url = self.resources_url();
        let result = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(response) => {
                tracing::info!(status = %response.status(), "Hourglass connection check passed");
                ConnectionReport::success(url)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Hourglass connection check failed");
                ConnectionReport::error(format!("Connection failed: {}", e))
            }
        }
    }
}
