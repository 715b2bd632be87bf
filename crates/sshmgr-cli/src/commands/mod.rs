//! CLI command implementations.

pub mod config;
pub mod folder;
pub mod profiles;
pub mod vault;
