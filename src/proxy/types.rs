//! Inbound query types for the resources endpoint.

use crate::error::Error;
use crate::hourglass::ResourceQuery;

/// Raw query string of `GET /api/resources`.
///
/// Kept as strings so a bad `activeOnly` surfaces as a coursetrack error
/// with a `detail` body instead of axum's plain-text rejection.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ResourceParams {
    pub active_only: Option<String>,
    pub resource_type: Option<String>,
    pub service_offering: Option<String>,
}

impl ResourceParams {
    /// Collect the recognised keys from decoded query pairs.
    ///
    /// A repeated key keeps its last value. Unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "activeOnly" => params.active_only = Some(value),
                "resourceType" => params.resource_type = Some(value),
                "serviceOffering" => params.service_offering = Some(value),
                _ => {}
            }
        }
        params
    }
}

/// Parse a boolean flag the way form-style query strings spell it.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl TryFrom<ResourceParams> for ResourceQuery {
    type Error = Error;

    fn try_from(params: ResourceParams) -> Result<Self, Self::Error> {
        let active_only = match params.active_only {
            None => true,
            Some(raw) => parse_flag(&raw).ok_or(Error::InvalidQuery {
                name: "activeOnly",
                value: raw,
            })?,
        };

        Ok(ResourceQuery {
            active_only,
            resource_type: params.resource_type,
            service_offering: params.service_offering,
        })
    }
}
