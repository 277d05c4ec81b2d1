//! Configuration for the presentation layer.
//!
//! Loads ${SKEIN_HOME}/config.toml with sensible defaults. Unknown keys
//! are ignored so callers can share one config file with the agent.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod paths {
    //! SKEIN_HOME resolution order:
    //! 1. SKEIN_HOME environment variable (if set)
    //! 2. ~/.config/skein (default)

    use std::path::PathBuf;

    pub fn skein_home() -> PathBuf {
        if let Ok(home) = std::env::var("SKEIN_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .map(|h| h.join(".config").join("skein"))
            .expect("Could not determine home directory")
    }

    pub fn config_path() -> PathBuf {
        skein_home().join("config.toml")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the streaming text-generation endpoint.
    pub endpoint_base_url: String,

    /// Model identifier sent with each completion request.
    pub model: String,

    /// Connect timeout for the streaming connection, in seconds.
    pub connect_timeout_secs: u32,

    /// Whether to animate indicators. Callers normally disable this when
    /// stdout is not a terminal.
    pub animate: bool,
}

impl Config {
    const DEFAULT_BASE_URL: &'static str = "http://localhost:8080";
    const DEFAULT_MODEL: &'static str = "default";
    const DEFAULT_CONNECT_TIMEOUT_SECS: u32 = 30;

    /// Loads config from the default location, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&paths::config_path())
    }

    /// Loads config from a specific path.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            connect_timeout_secs: Self::DEFAULT_CONNECT_TIMEOUT_SECS,
            animate: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load_from_path(&dir.path().join("config.toml")).expect("load");
        assert_eq!(config.endpoint_base_url, Config::DEFAULT_BASE_URL);
        assert_eq!(config.connect_timeout_secs, 30);
        assert!(config.animate);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut f = fs::File::create(&path).expect("create");
        writeln!(f, "model = \"tiny\"\nanimate = false").expect("write");

        let config = Config::load_from_path(&path).expect("load");
        assert_eq!(config.model, "tiny");
        assert!(!config.animate);
        assert_eq!(config.endpoint_base_url, Config::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = [broken").expect("write");
        assert!(Config::load_from_path(&path).is_err());
    }
}
