//! Client for the Hourglass resources API.
//!
//! Holds one reusable HTTP client carrying the base URL, the JSON content
//! type and the `X-Api-Key` header, shared by every inbound request.

mod client;
pub mod types;

pub use client::{HourglassClient, API_KEY_HEADER, RESOURCES_PATH};
pub use types::{ConnectionReport, ConnectionStatus, ResourceQuery, UpstreamResponse};
