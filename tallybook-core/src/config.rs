//! Configuration management
//!
//! Settings live in `settings.json` in the data directory:
//! ```json
//! { "backend": "remote", "apiUrl": "http://localhost:8080", "logLevel": "info" }
//! ```
//! Fields this crate does not manage are kept as-is when saving.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::rest::DEFAULT_API_URL;

pub const SETTINGS_FILE: &str = "settings.json";
pub const BACKEND_ENV: &str = "TALLYBOOK_BACKEND";
pub const API_URL_ENV: &str = "TALLYBOOK_API_URL";

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Where entries and users are persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Embedded DuckDB store in the data directory
    #[default]
    Local,
    /// Remote REST backend at `apiUrl`
    Remote,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Local => "local",
            Backend::Remote => "remote",
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "remote" => Ok(Backend::Remote),
            other => anyhow::bail!("Unknown backend '{}', expected local or remote", other),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend: Option<Backend>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    api_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl SettingsFile {
    fn read(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        match serde_json::from_str(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                tracing::warn!("ignoring malformed {}: {}", path.display(), e);
                Ok(Self::default())
            }
        }
    }
}

/// Effective configuration after environment overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: Backend,
    pub api_url: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Local,
            api_url: DEFAULT_API_URL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Load settings from `data_dir`, then apply `TALLYBOOK_BACKEND` and
    /// `TALLYBOOK_API_URL`
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    /// Settings as stored in the file, ignoring the environment
    ///
    /// Use this before `save` so overrides never end up persisted.
    pub fn load_file(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |_| None)
    }

    fn load_with_env(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = SettingsFile::read(data_dir)?;
        let defaults = Config::default();

        let backend = match env(BACKEND_ENV) {
            Some(value) => match value.parse() {
                Ok(backend) => backend,
                Err(e) => {
                    tracing::warn!("{} ignored: {}", BACKEND_ENV, e);
                    raw.backend.unwrap_or_default()
                }
            },
            None => raw.backend.unwrap_or_default(),
        };

        Ok(Self {
            backend,
            api_url: env(API_URL_ENV)
                .filter(|url| !url.trim().is_empty())
                .or(raw.api_url)
                .unwrap_or(defaults.api_url),
            log_level: raw.log_level.unwrap_or(defaults.log_level),
        })
    }

    /// Write the managed fields back, keeping everything else in the file
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let mut settings = SettingsFile::read(data_dir)?;
        settings.backend = Some(self.backend);
        settings.api_url = Some(self.api_url.clone());
        settings.log_level = Some(self.log_level.clone());

        let path = data_dir.join(SETTINGS_FILE);
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
