//! Taskboard configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main Taskboard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote task store connection
    pub api: ApiConfig,

    /// Terminal output
    pub output: OutputConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.api.token_env).is_err() {
            return Err(eyre::eyre!(
                "Task store token not found. Set the {} environment variable.",
                self.api.token_env
            ));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(eyre::eyre!(
                "Invalid base-url '{}': must start with http:// or https://",
                self.api.base_url
            ));
        }
        Ok(())
    }

    /// Config files tried in order when no path is given on the command line
    ///
    /// The project file `.taskboard.yml` wins over the per-user
    /// `<config_dir>/taskboard/taskboard.yml`.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".taskboard.yml")];
        paths.extend(dirs::config_dir().map(|dir| dir.join("taskboard").join("taskboard.yml")));
        paths
    }

    /// Load configuration
    ///
    /// An explicit path must load. Otherwise the first readable file from
    /// [`Config::search_paths`] is used; a broken one is logged and skipped.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => {
                Self::load_from_file(path).wrap_err_with(|| format!("Failed to load config from {}", path.display()))
            }
            None => Ok(Self::first_of(&Self::search_paths())),
        }
    }

    fn first_of(candidates: &[PathBuf]) -> Self {
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "load: skipping unreadable config"),
            }
        }
        tracing::info!("load: no config file found, using defaults");
        Self::default()
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).wrap_err("Failed to read config file")?;
        let config = serde_yaml::from_str(&content).wrap_err("Failed to parse config file")?;
        tracing::info!(path = %path.display(), "load: config loaded");
        Ok(config)
    }
}

/// Remote task store connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Store base URL, including any path prefix
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Environment variable containing the bearer token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl ApiConfig {
    /// Read the bearer token from the configured environment variable
    pub fn get_token(&self) -> Result<String> {
        std::env::var(&self.token_env).context(format!("Environment variable {} is not set", self.token_env))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            token_env: "TASKBOARD_TOKEN".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Terminal output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Colourise the board rendering
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}
