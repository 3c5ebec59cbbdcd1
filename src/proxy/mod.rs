//! HTTP proxy server module.
//!
//! This module provides the HTTP API the front-end calls and forwards
//! resource queries to Hourglass.

mod handlers;
mod server;
pub mod types;

pub use handlers::{LATENCY_MS_HEADER, REQUEST_ID_HEADER, UPSTREAM_STATUS_HEADER};
pub use server::{create_router, run_server, AppState, RequestId};
pub use types::{parse_flag, ResourceParams};
