//! coursetrack - backend proxy for the CourseTrack front-end
//!
//! This library provides the core functionality for the coursetrack proxy,
//! including configuration, the Hourglass client and the HTTP server.

pub mod config;
pub mod error;
pub mod hourglass;
pub mod proxy;

pub use config::Config;
pub use error::{Error, Result};
