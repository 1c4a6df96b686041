use crate::core::error::TchatError;
use std::collections::HashMap;
use std::fmt;

/// Every environment variable toolchat reads.
pub const KNOWN_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "GEMINI_BASE_URL",
    "GEMINI_API_MODEL",
    "TOGETHER_API_KEY",
    "TOGETHER_BASE_URL",
    "TOGETHER_MODEL",
    "TOGETHER_MODEL1",
    "OPENROUTER_API_KEY",
    "OPENROUTER_BASE_URL",
    "OPENROUTER_MODEL",
    "WEATHER_API_KEY",
    "WEATHER_BASE_URL",
    "NEWS_API_KEY",
    "NEWS_BASE_URL",
    "JOKE_BASE_URL",
    "CURRENCY_EXCHANGE_API_KEY",
    "CURRENCY_EXCHANGE_URL",
    "IPINFO_API_TOKEN",
    "IPINFO_BASE_URL",
];

/// Read-only snapshot of credentials and endpoints, taken once at startup.
/// Blank values count as unset.
#[derive(Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let values = KNOWN_VARS
            .iter()
            .filter_map(|key| {
                lookup(key)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .map(|v| (key.to_string(), v))
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    pub fn require(&self, key: &str, owner: &str) -> Result<&str, TchatError> {
        self.get(key).ok_or_else(|| {
            TchatError::Config(format!("{} is not set (required by {})", key, owner))
        })
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("Secrets").field("set", &keys).finish()
    }
}
