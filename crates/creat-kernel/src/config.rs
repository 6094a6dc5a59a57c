//! User configuration.
//!
//! Read from `~/.config/creat/config.toml`. Every key is optional:
//!
//! ```toml
//! data_dir = "/home/me/.local/share/creat"
//! preview_height = 300
//! image_max_bytes = 5242880
//! generation_model = "gemini-2.5-flash"
//! generation_command = "llm -m gemini-2.5-flash"
//! generation_timeout_secs = 120
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::image::DEFAULT_MAX_BYTES;
use crate::llm::{DEFAULT_MODEL, DEFAULT_TIMEOUT};
use crate::preview::DEFAULT_PREVIEW_HEIGHT;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Settings for the kernel and CLI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatConfig {
    /// Directory holding the persisted collection.
    pub data_dir: PathBuf,
    /// Preview height for code blocks without their own.
    pub preview_height: u32,
    /// Size cap for ingested images.
    pub image_max_bytes: u64,
    /// Model identifier sent with generation requests.
    pub generation_model: String,
    /// Program (with arguments) used as the generation backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_command: Option<String>,
    /// Time limit for one generation call.
    pub generation_timeout_secs: u64,
}

impl Default for CreatConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            preview_height: DEFAULT_PREVIEW_HEIGHT,
            image_max_bytes: DEFAULT_MAX_BYTES,
            generation_model: DEFAULT_MODEL.to_string(),
            generation_command: None,
            generation_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Default config file path (`~/.config/creat/config.toml`).
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("creat").join("config.toml"))
}

/// Default data directory (`~/.local/share/creat`).
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("creat")
}

impl CreatConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a specific file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text, path)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load the default config file, or defaults if there is none.
    pub fn load() -> Result<Self, ConfigError> {
        let Some(path) = config_file_path() else {
            tracing::info!("no config directory available, using defaults");
            return Ok(Self::default());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config = CreatConfig::from_toml("", Path::new("config.toml")).unwrap();
        assert_eq!(config, CreatConfig::default());
        assert_eq!(config.preview_height, 300);
        assert_eq!(config.image_max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.generation_model, "gemini-2.5-flash");
        assert!(config.generation_command.is_none());
        assert_eq!(config.generation_timeout_secs, 120);
    }

    #[test]
    fn test_partial_override() {
        let config = CreatConfig::from_toml(
            "preview_height = 480\ngeneration_command = \"llm -m x\"\ngeneration_timeout_secs = 15\n",
            Path::new("config.toml"),
        )
        .unwrap();
        assert_eq!(config.preview_height, 480);
        assert_eq!(config.generation_command.as_deref(), Some("llm -m x"));
        assert_eq!(config.generation_timeout_secs, 15);
        assert_eq!(config.image_max_bytes, DEFAULT_MAX_BYTES);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = \"/tmp/creat-docs\"\n").unwrap();

        let config = CreatConfig::load_from(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/creat-docs"));

        assert!(matches!(
            CreatConfig::load_from(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let err = CreatConfig::from_toml("preview_height = \"tall\"", Path::new("c.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("c.toml"));
    }
}
