//! API server configuration.
//!
//! Loaded from the TOML file named by `SHEETDESK_CONFIG` when set, otherwise
//! from individual environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use sd_rag::{ChatConfig, EmbeddingConfig, RagConfig};
use sd_sheets::SheetsConfig;

pub const CONFIG_PATH_VAR: &str = "SHEETDESK_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Listen address.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub rag: RagConfig,
}

impl AppConfig {
    /// Load from `SHEETDESK_CONFIG` if set, else from the environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        let server = ServerConfig {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
        };
        Self {
            server,
            sheets: SheetsConfig::from_env(),
            chat: ChatConfig::from_env(),
            embedding: EmbeddingConfig::from_env(),
            rag: RagConfig::from_env(),
        }
    }

    /// Fail fast on settings that would make every request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sheets.spreadsheet_id.is_some() && self.sheets.access_token.is_none() {
            return Err(ConfigError::Missing("SHEETS_ACCESS_TOKEN"));
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::Invalid("rag.top_k must be at least 1".into()));
        }
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::Invalid(format!(
                "chat.temperature {} outside 0.0..=2.0",
                self.chat.temperature
            )));
        }
        Ok(())
    }
}
