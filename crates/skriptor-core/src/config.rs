use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::format::ScriptFormat;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_EXPECTED_MODEL: &str = "llama3.1";
pub const DEFAULT_STATS_THRESHOLD: u64 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub default_format: ScriptFormat,
    /// Model the backend is expected to serve; named in the health hint.
    pub expected_model: String,
    pub stats_threshold: u64,
    pub request_timeout_secs: u64,
    /// Escape markup-significant characters before rendering turns.
    pub escape_markup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            default_format: ScriptFormat::Txt,
            expected_model: DEFAULT_EXPECTED_MODEL.to_string(),
            stats_threshold: DEFAULT_STATS_THRESHOLD,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            escape_markup: true,
        }
    }

    /// Load from the user config directory, falling back to defaults when no file exists.
    /// `SKRIPTOR_BASE_URL` overrides the stored base URL.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;

        if let Ok(url) = std::env::var("SKRIPTOR_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }

        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {:?}: {}", path, e))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn save_default_format(format: ScriptFormat) -> Result<()> {
        let mut config = Self::load_from(&Self::get_config_path()?).unwrap_or_else(|_| Self::new());
        config.default_format = format;
        config.save()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("skriptor").join("config.json"))
    }
}
