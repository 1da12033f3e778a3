//! Configuration loading and board override resolution

use gpdfan_core::{BoardKind, GpdFanError, Result, StaticConfig};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

/// Load the static config from TOML, writing defaults if the file is missing.
pub(crate) async fn load(path: &Path) -> Result<StaticConfig> {
    if !path.exists() {
        info!(
            "Config not found at {}. Creating with defaults.",
            path.display()
        );

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                GpdFanError::Config(format!(
                    "Failed to create config directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let config = StaticConfig::default();
        let toml_str = config
            .to_toml()
            .map_err(|e| GpdFanError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, &toml_str)
            .await
            .map_err(|e| GpdFanError::Config(format!("Failed to write config file: {}", e)))?;

        return Ok(config);
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| GpdFanError::Config(format!("Failed to read config file: {}", e)))?;

    StaticConfig::from_toml(&content)
        .map_err(|e| GpdFanError::Config(format!("Failed to parse config file: {}", e)))
}

/// Board override: `--board` wins over `[fan].board`.
///
/// A name that matches no board is logged and dropped, leaving selection to
/// DMI.
pub(crate) fn board_override(cli: Option<&str>, config: &StaticConfig) -> Option<BoardKind> {
    let name = cli.or(config.fan.board.as_deref())?;

    match name.parse::<BoardKind>() {
        Ok(kind) => {
            info!("Board override: {}", kind);
            Some(kind)
        }
        Err(e) => {
            warn!("Ignoring board override '{}': {}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_config_written_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = load(&path).await.unwrap();
        assert_eq!(config.server.port, 3071);
        assert!(path.exists());

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[fan]"));
    }

    #[tokio::test]
    async fn test_existing_config_loaded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[fan]\nboard = \"duo\"\n\n[debug]\nregisters = true\n").unwrap();

        let config = load(&path).await.unwrap();
        assert_eq!(config.fan.board.as_deref(), Some("duo"));
        assert!(config.debug.registers);
    }

    #[tokio::test]
    async fn test_malformed_config_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[fan\nboard = ").unwrap();

        assert!(matches!(load(&path).await, Err(GpdFanError::Config(_))));
    }

    #[test]
    fn test_board_override_precedence() {
        let mut config = StaticConfig::default();
        config.fan.board = Some("wm2".to_string());

        assert_eq!(
            board_override(Some("duo"), &config),
            Some(BoardKind::Duo)
        );
        assert_eq!(board_override(None, &config), Some(BoardKind::WinMax2));
        assert_eq!(board_override(None, &StaticConfig::default()), None);
    }

    #[test]
    fn test_unknown_override_ignored() {
        let config = StaticConfig::default();
        assert_eq!(board_override(Some("steamdeck"), &config), None);
    }
}
