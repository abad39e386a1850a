//! Configuration management for Ponts.
//!
//! Loads configuration from ${PONTS_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Env var overriding `base_url`.
pub const BASE_URL_ENV: &str = "PONTS_BASE_URL";

/// Env var overriding `model`.
pub const MODEL_ENV: &str = "PONTS_MODEL";

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for Ponts configuration and data directories.
    //!
    //! PONTS_HOME resolution order:
    //! 1. PONTS_HOME environment variable (if set)
    //! 2. ~/.config/ponts (default)
    //! 3. ./.ponts when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the Ponts home directory.
    pub fn ponts_home() -> PathBuf {
        if let Ok(home) = std::env::var("PONTS_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".ponts"),
            |h| h.join(".config").join("ponts"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        ponts_home().join("config.toml")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        ponts_home().join("logs")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat server.
    pub base_url: String,

    /// Model name sent with every request.
    pub model: String,

    /// Context window requested from the server.
    pub num_ctx: u32,

    /// Optional inline system prompt.
    pub system_prompt: Option<String>,

    /// Optional path to a file containing the system prompt.
    pub system_prompt_file: Option<String>,

    /// Optional URL serving the system prompt as plain text.
    pub system_prompt_url: Option<String>,

    /// Whole-request timeout in seconds (0 disables).
    pub request_timeout_secs: u64,

    /// Connection timeout in seconds (0 disables).
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            num_ctx: Self::DEFAULT_NUM_CTX,
            system_prompt: None,
            system_prompt_file: None,
            system_prompt_url: None,
            request_timeout_secs: 0,
            connect_timeout_secs: Self::DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
    pub const DEFAULT_MODEL: &str = "deepseek-r1:32b";
    pub const DEFAULT_NUM_CTX: u32 = 40000;
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Applies environment overrides (env > config > default).
    ///
    /// # Errors
    /// Returns an error if the resulting base URL is not a valid URL.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        self.base_url = resolve_base_url(Some(&self.base_url), BASE_URL_ENV, Self::DEFAULT_BASE_URL)?;
        if let Ok(model) = std::env::var(MODEL_ENV) {
            let trimmed = model.trim();
            if !trimmed.is_empty() {
                self.model = trimmed.to_string();
            }
        }
        Ok(self)
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    fn write_config(path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
        }
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the chosen URL does not parse.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.num_ctx, 40000);
        assert_eq!(config.model, "deepseek-r1:32b");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = \"qwen3:8b\"\nnum_ctx = 8192\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "qwen3:8b");
        assert_eq!(config.num_ctx, 8192);
        assert_eq!(config.base_url, Config::DEFAULT_BASE_URL);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "model = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let config: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::init(&path).unwrap();
        assert!(path.exists());
        assert!(Config::init(&path).is_err());
    }

    #[test]
    fn test_resolve_base_url_prefers_config_over_default() {
        let url = resolve_base_url(
            Some("http://gpu-box:11434/"),
            "PONTS_TEST_UNSET_BASE_URL",
            "http://localhost:11434",
        )
        .unwrap();
        assert_eq!(url, "http://gpu-box:11434");
    }

    #[test]
    fn test_resolve_base_url_rejects_garbage() {
        assert!(resolve_base_url(Some("not a url"), "PONTS_TEST_UNSET_BASE_URL", "x").is_err());
    }

    #[test]
    fn test_zero_timeouts_disable() {
        let config = Config {
            request_timeout_secs: 0,
            connect_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.connect_timeout(), None);
        assert_eq!(
            Config::default().connect_timeout(),
            Some(Duration::from_secs(10))
        );
    }
}
