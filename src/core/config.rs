use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::tool::Tool;

/// Environment variable overriding `dialogue.base_url`.
pub const BASE_URL_ENV: &str = "DECISION_DIALOGUE_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub dialogue: DialogueConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    pub base_url: String,
    /// Seconds before an in-flight dialogue request is abandoned; 0 waits forever.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub default_tool: Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Extra `*.toml` flows loaded on top of the built-in ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flows_dir: Option<PathBuf>,
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: default_request_timeout_secs(),
            default_tool: Tool::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            flows_dir: None,
        }
    }
}

fn config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "decision-maker", "decision-maker")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

impl Config {
    /// Loads the user config (or defaults) and applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match config_file() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Config::default(),
        };
        config.apply_env(std::env::var(BASE_URL_ENV).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|url| !url.trim().is_empty()) {
            tracing::debug!("Using dialogue service URL from {}: {}", BASE_URL_ENV, url);
            self.dialogue.base_url = url.trim().trim_end_matches('/').to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dialogue.base_url, "http://localhost:8000");
        assert_eq!(config.dialogue.request_timeout_secs, 60);
        assert_eq!(config.dialogue.default_tool, Tool::DecisionContext);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env(Some("http://dialogue.internal:9000/".to_string()));
        assert_eq!(config.dialogue.base_url, "http://dialogue.internal:9000");

        config.apply_env(Some("   ".to_string()));
        assert_eq!(config.dialogue.base_url, "http://dialogue.internal:9000");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[dialogue]\nbase_url = \"http://127.0.0.1:7000\"\ndefault_tool = \"debrief\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.dialogue.base_url, "http://127.0.0.1:7000");
        assert_eq!(config.dialogue.default_tool, Tool::Debrief);
        assert_eq!(config.dialogue.request_timeout_secs, 60);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.server.port = 8123;
        config.server.flows_dir = Some(dir.path().join("flows"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server.port, 8123);
        assert_eq!(loaded.server.flows_dir, config.server.flows_dir);
    }
}
