//! # sshmgr-core
//!
//! Core types, configuration, and utilities for sshmgr.
//!
//! This crate provides shared functionality used across all sshmgr crates:
//!
//! - **Configuration**: Loading, validation, and persistence of the config file
//! - **Types**: Connection profiles, folder paths, and secret field representations
//! - **Utilities**: Path resolution, ID generation, and environment handling

pub mod config;
pub mod types;
pub mod error;
pub mod paths;
pub mod env;
pub mod id;
pub mod secret;

// Re-exports for convenience
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
pub use secret::SecretString;
