//! HTTP request handlers for the Delve web server
//!
//! This module contains all the HTTP request handlers organized by functionality.

pub mod health;
pub mod research;
pub mod types;

// Re-export all handler functions to maintain API compatibility
pub use health::*;
pub use research::*;

// Re-export all types for convenience
pub use types::*;
