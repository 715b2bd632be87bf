//! Core types for sshmgr.

mod connection;
mod folder;
mod secret_value;

pub use connection::*;
pub use folder::*;
pub use secret_value::*;
