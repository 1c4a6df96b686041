use crate::core::error::TchatError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub mod profile;
pub mod secrets;

pub use profile::{Profile, ProfileSettings, ProviderKind, ToolMode};
pub use secrets::Secrets;

fn default_max_tool_rounds() -> usize {
    8
}

/// Per-profile settings that win over the environment.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProfileOverride {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub tool_mode: Option<ToolMode>,
}

/// Fixed upstream timeouts. No call is retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub connect_secs: u64,
    pub provider_secs: u64,
    pub tool_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            provider_secs: 120,
            tool_secs: 10,
        }
    }
}

impl Timeouts {
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn provider(&self) -> Duration {
        Duration::from_secs(self.provider_secs)
    }

    pub fn tool(&self) -> Duration {
        Duration::from_secs(self.tool_secs)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub input: bool,
    pub output: bool,
}

/// Returned by the `developer_info` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeveloperInfo {
    pub name: String,
    pub mail: String,
    pub github_profile: String,
}

impl Default for DeveloperInfo {
    fn default() -> Self {
        Self {
            name: "toolchat developers".to_string(),
            mail: "not configured".to_string(),
            github_profile: "not configured".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub guardrails: GuardrailConfig,
    #[serde(default)]
    pub developer: DeveloperInfo,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverride>,
    #[serde(default)]
    pub transcript_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            active_profile: None,
            max_tool_rounds: default_max_tool_rounds(),
            timeouts: Timeouts::default(),
            guardrails: GuardrailConfig::default(),
            developer: DeveloperInfo::default(),
            profiles: HashMap::new(),
            transcript_dir: None,
        }
    }
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".toolchat")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Load `~/.toolchat/config.yaml`, writing the defaults on first run.
    pub fn load() -> Result<Config, TchatError> {
        Self::load_or_create(&Self::config_path())
    }

    /// Load `path`, or write the defaults there when it does not exist. A
    /// failed write is logged and the defaults are still used.
    pub fn load_or_create(path: &Path) -> Result<Config, TchatError> {
        if path.exists() {
            return Self::load_from(path);
        }

        let config = Config::default();
        if let Err(e) = config.save_to(path) {
            warn!(path = %path.display(), "could not write default config: {}", e);
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Config, TchatError> {
        let contents = fs::read_to_string(path)?;
        serde_yml::from_str::<Config>(&contents)
            .map_err(|e| TchatError::Config(format!("Parse {}: {}", path.display(), e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), TchatError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }

    pub fn history_dir(&self) -> PathBuf {
        self.transcript_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("history"))
    }

    /// Profile selected by the config file; unknown names are an error.
    pub fn default_profile(&self) -> Result<Profile, TchatError> {
        match &self.active_profile {
            Some(name) => name.parse(),
            None => Ok(Profile::default()),
        }
    }

    pub fn profile_override(&self, profile: Profile) -> Option<&ProfileOverride> {
        self.profiles
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(profile.name()))
            .map(|(_, o)| o)
    }
}
