//! Request and response types for Hourglass calls.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Filters forwarded to `GET /api/resources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    pub active_only: bool,
    pub resource_type: Option<String>,
    pub service_offering: Option<String>,
}

impl Default for ResourceQuery {
    fn default() -> Self {
        Self {
            active_only: true,
            resource_type: None,
            service_offering: None,
        }
    }
}

impl ResourceQuery {
    /// Query pairs in the order Hourglass receives them.
    ///
    /// `activeOnly` is always sent. The string filters are sent only when
    /// non-empty.
    pub fn upstream_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("activeOnly", self.active_only.to_string())];
        if let Some(resource_type) = self.resource_type.as_deref().filter(|s| !s.is_empty()) {
            params.push(("resourceType", resource_type.to_string()));
        }
        if let Some(offering) = self.service_offering.as_deref().filter(|s| !s.is_empty()) {
            params.push(("serviceOffering", offering.to_string()));
        }
        params
    }
}

/// Successful Hourglass answer.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

/// Outcome reported by the connection check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Success,
    Error,
}

/// Body of `GET /api/check-connection` and `coursetrack ping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub status: ConnectionStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ConnectionReport {
    pub fn success(url: String) -> Self {
        Self {
            status: ConnectionStatus::Success,
            message: "Connection to Hourglass API successful".to_string(),
            url: Some(url),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ConnectionStatus::Error,
            message: message.into(),
            url: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ConnectionStatus::Success
    }
}
