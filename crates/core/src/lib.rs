//! Core utilities shared by the vkboot crates.
//!
//! This crate provides foundational types used across the workspace:
//! - Error types and result aliases
//! - Logging initialization
//! - Configuration loading

pub mod config;
mod error;
mod logging;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use logging::init_logging;
