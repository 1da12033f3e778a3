//! gpdfan Core Library
//!
//! Shared types, board tables, and configuration for GPD handheld fan
//! control. Used by the hardware crate and the daemon.

pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use board::{select_board, BoardDescriptor, BoardKind, DmiIdentity};
pub use config::{default_config_path, StaticConfig};
pub use error::*;
pub use types::*;
