//! Configuration types for gpdfan
//!
//! The daemon reads a single [`StaticConfig`] at startup. Fan state itself is
//! deliberately not persisted: every start begins in automatic mode.

mod paths;
mod static_config;

pub use paths::default_config_path;
pub use static_config::{DebugConfig, FanConfig, ServerConfig, StaticConfig};
