//! linebridge-core — configuration, constants and the shared error type for
//! the LINE ⇄ Claude Code bridge.

pub mod config;
pub mod error;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
