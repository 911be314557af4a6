//! Scrubmark Common Utilities
//!
//! Shared infrastructure for all Scrubmark crates:
//! - Error types and result aliases
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
