//! Static configuration loaded once at startup
//!
//! This configuration is read-only after the daemon starts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::UpdateInterval;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3071
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Fan channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanConfig {
    /// Board override (`win_mini`, `duo`, `win4`, `wm2`); DMI when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    /// Initial cache refresh interval in milliseconds
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    /// How long to wait for the EC lock before reporting busy
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_update_interval_ms() -> u64 {
    1000
}

fn default_lock_timeout_ms() -> u64 {
    1000
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            board: None,
            update_interval_ms: default_update_interval_ms(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl FanConfig {
    /// Configured interval, floored and clamped like a runtime write.
    pub fn update_interval(&self) -> UpdateInterval {
        UpdateInterval::from_millis(self.update_interval_ms.min(i64::MAX as u64) as i64)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Diagnostic surface configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Expose raw register peek/poke endpoints
    #[serde(default)]
    pub registers: bool,
}

/// Static configuration for the gpdfan daemon.
///
/// Located at `~/.config/gpdfan/config.toml` by default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticConfig {
    /// Server configuration (bind address, port)
    #[serde(default)]
    pub server: ServerConfig,

    /// Fan channel configuration
    #[serde(default)]
    pub fan: FanConfig,

    /// Diagnostic surface
    #[serde(default)]
    pub debug: DebugConfig,
}

impl StaticConfig {
    /// Parse StaticConfig from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize StaticConfig to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_static_config() {
        let config = StaticConfig::default();
        assert_eq!(config.server.port, 3071);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.fan.board, None);
        assert_eq!(config.fan.update_interval().as_secs(), 1);
        assert_eq!(config.fan.lock_timeout(), Duration::from_millis(1000));
        assert!(!config.debug.registers);
    }

    #[test]
    fn test_static_config_serialization() {
        let config = StaticConfig::default();
        let toml_str = config.to_toml().unwrap();

        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[fan]"));
        assert!(toml_str.contains("update_interval_ms"));
        assert!(!toml_str.contains("board"));
    }

    #[test]
    fn test_static_config_deserialization() {
        let toml_str = r#"
            [server]
            bind = "0.0.0.0"
            port = 8080

            [fan]
            board = "wm2"
            update_interval_ms = 2500
            lock_timeout_ms = 50

            [debug]
            registers = true
        "#;

        let config = StaticConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.fan.board.as_deref(), Some("wm2"));
        assert_eq!(config.fan.update_interval().as_secs(), 2);
        assert_eq!(config.fan.lock_timeout(), Duration::from_millis(50));
        assert!(config.debug.registers);
    }

    #[test]
    fn test_static_config_partial_file_uses_defaults() {
        let config = StaticConfig::from_toml("[fan]\nupdate_interval_ms = 10\n").unwrap();
        assert_eq!(config.server.port, 3071);
        assert_eq!(config.fan.update_interval().as_secs(), 1);
        assert_eq!(config.fan.lock_timeout_ms, 1000);
    }
}
