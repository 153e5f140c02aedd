//! Configuration: env toggles plus the optional `dayflow.toml` user file.

use crate::planner::TemplateSelector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_DATA_PATH: &str = "./data/dayflow";
const DEFAULT_SUMMARY_DAYS: u32 = 7;
const MAX_SUMMARY_DAYS: u32 = 90;

/// Offline template policy selectable from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSelection {
    #[default]
    RoundRobin,
    DateHash,
}

impl TemplateSelection {
    pub fn selector(&self) -> TemplateSelector {
        match self {
            Self::RoundRobin => TemplateSelector::round_robin(),
            Self::DateHash => TemplateSelector::DateHash,
        }
    }
}

/// Runtime configuration loaded from environment.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | DAYFLOW_DATA_PATH | ./data/dayflow | sled directory for the record store. |
/// | DAYFLOW_SUMMARY_DAYS | 7 | Look-back window for summaries (1–90). |
/// | DAYFLOW_OFFLINE | false | Never call the text-completion API. |
/// | DAYFLOW_LLM_API_URL | (DeepSeek) | OpenAI-compatible base URL. |
/// | DAYFLOW_LLM_MODEL | deepseek-chat | Model name. |
/// | DAYFLOW_LLM_TIMEOUT_SECS | (none) | Optional HTTP timeout for one completion. |
/// | DAYFLOW_TEMPLATE_SELECTION | round_robin | "round_robin" \| "date_hash". |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayflowConfig {
    pub data_path: PathBuf,
    pub summary_days: u32,
    pub offline: bool,
    pub llm_api_url: Option<String>,
    pub llm_model: Option<String>,
    /// `None` leaves the completion call unbounded.
    pub llm_timeout: Option<Duration>,
    pub template_selection: TemplateSelection,
}

impl Default for DayflowConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            summary_days: DEFAULT_SUMMARY_DAYS,
            offline: false,
            llm_api_url: None,
            llm_model: None,
            llm_timeout: None,
            template_selection: TemplateSelection::RoundRobin,
        }
    }
}

impl DayflowConfig {
    /// Unset or invalid values fall back to defaults.
    pub fn from_env() -> Self {
        Self {
            data_path: env_opt_string("DAYFLOW_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
            summary_days: env_summary_days(),
            offline: env_bool("DAYFLOW_OFFLINE", false),
            llm_api_url: env_opt_string("DAYFLOW_LLM_API_URL"),
            llm_model: env_opt_string("DAYFLOW_LLM_MODEL"),
            llm_timeout: env_opt_string("DAYFLOW_LLM_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
            template_selection: match env_opt_string("DAYFLOW_TEMPLATE_SELECTION")
                .map(|s| s.to_lowercase())
                .as_deref()
            {
                Some("date_hash") => TemplateSelection::DateHash,
                _ => TemplateSelection::RoundRobin,
            },
        }
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => {
            let v = v.trim();
            if v.is_empty() {
                default
            } else {
                v.eq_ignore_ascii_case("true") || v == "1"
            }
        }
        Err(_) => default,
    }
}

fn env_summary_days() -> u32 {
    env_opt_string("DAYFLOW_SUMMARY_DAYS")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(DEFAULT_SUMMARY_DAYS)
        .clamp(1, MAX_SUMMARY_DAYS)
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config write: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Per-user settings kept in `dayflow.toml` (API credential and model overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub llm_model: Option<String>,
    #[serde(default)]
    pub llm_api_url: Option<String>,
}

impl UserConfig {
    /// Missing file => empty config.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Priority: dayflow.toml > DAYFLOW_LLM_API_KEY > DEEPSEEK_API_KEY > OPENAI_API_KEY.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| env_opt_string("DAYFLOW_LLM_API_KEY"))
            .or_else(|| env_opt_string("DEEPSEEK_API_KEY"))
            .or_else(|| env_opt_string("OPENAI_API_KEY"))
    }

    pub fn get_llm_model(&self) -> Option<String> {
        self.llm_model.clone().filter(|s| !s.trim().is_empty())
    }

    pub fn get_llm_api_url(&self) -> Option<String> {
        self.llm_api_url.clone().filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dayflow.toml");
        let config = UserConfig {
            api_key: Some("sk-local".to_string()),
            llm_model: Some("deepseek-chat".to_string()),
            llm_api_url: None,
        };
        config.save_to_path(&path).unwrap();
        let loaded = UserConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("sk-local"));
        assert_eq!(loaded.get_api_key().as_deref(), Some("sk-local"));
        assert_eq!(loaded.get_llm_model().as_deref(), Some("deepseek-chat"));
        assert!(loaded.get_llm_api_url().is_none());
    }

    #[test]
    fn missing_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = UserConfig::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.api_key.is_none());
    }

    #[test]
    fn defaults_are_sane() {
        let config = DayflowConfig::default();
        assert_eq!(config.summary_days, 7);
        assert!(!config.offline);
        assert!(config.llm_timeout.is_none());
        assert_eq!(config.template_selection, TemplateSelection::RoundRobin);
    }
}
