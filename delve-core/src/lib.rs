//! Core foundation for the delve workspace
//!
//! Shared error handling, logging, configuration, async helpers, and the
//! research data model used by the domain and web crates.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used crates so downstream members share one version
pub use tokio;
pub use tracing;
