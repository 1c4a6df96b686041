use crate::config::Config;
use crate::config::secrets::Secrets;
use crate::core::error::TchatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    Together,
    OpenRouter,
}

impl ProviderKind {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Together => "together",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    pub fn key_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Together => "TOGETHER_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn base_url_env(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_BASE_URL",
            ProviderKind::Together => "TOGETHER_BASE_URL",
            ProviderKind::OpenRouter => "OPENROUTER_BASE_URL",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Together => "https://api.together.xyz/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

/// How tool calls travel between the model and the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    /// Provider-native function calling
    #[default]
    Native,
    /// JSON tool calls written in the reply text, described in the system prompt
    Prompt,
}

/// The built-in chat profiles. Each binds a conversation to one
/// provider/model pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Profile {
    #[default]
    GeminiFlash,
    MetaLlama,
    Exaone,
    DeepSeekChat,
}

impl Profile {
    pub const ALL: [Profile; 4] = [
        Profile::GeminiFlash,
        Profile::MetaLlama,
        Profile::Exaone,
        Profile::DeepSeekChat,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Profile::GeminiFlash => "Gemini-2.0-flash",
            Profile::MetaLlama => "Meta-Llama-32b",
            Profile::Exaone => "EXAONE-3.5-32b",
            Profile::DeepSeekChat => "DeepSeek-Chat-V3",
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            Profile::GeminiFlash => ProviderKind::Gemini,
            Profile::MetaLlama | Profile::Exaone => ProviderKind::Together,
            Profile::DeepSeekChat => ProviderKind::OpenRouter,
        }
    }

    pub fn model_env(&self) -> &'static str {
        match self {
            Profile::GeminiFlash => "GEMINI_API_MODEL",
            Profile::MetaLlama => "TOGETHER_MODEL",
            Profile::Exaone => "TOGETHER_MODEL1",
            Profile::DeepSeekChat => "OPENROUTER_MODEL",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Profile::GeminiFlash => "gemini-2.0-flash",
            Profile::MetaLlama => "meta-llama/Llama-3.2-3B-Instruct-Turbo",
            Profile::Exaone => "lgai/exaone-3-5-32b-instruct",
            Profile::DeepSeekChat => "deepseek/deepseek-chat-v3-0324:free",
        }
    }

    pub fn default_tool_mode(&self) -> ToolMode {
        match self {
            Profile::Exaone => ToolMode::Prompt,
            _ => ToolMode::Native,
        }
    }

    pub fn description(&self) -> String {
        format!("The underlying LLM model is {}.", self.name())
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Profile {
    type Err = TchatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Profile::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = Profile::ALL.iter().map(|p| p.name()).collect();
                TchatError::Config(format!(
                    "Unknown profile '{}'. Available profiles: {}",
                    s,
                    known.join(", ")
                ))
            })
    }
}

/// A profile with every setting filled in and its credential present.
#[derive(Clone)]
pub struct ProfileSettings {
    pub profile: Profile,
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub tool_mode: ToolMode,
}

impl fmt::Debug for ProfileSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileSettings")
            .field("profile", &self.profile)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("tool_mode", &self.tool_mode)
            .finish_non_exhaustive()
    }
}

impl ProfileSettings {
    /// Resolve settings in order: explicit model override, config file,
    /// environment, built-in default. A missing key is a configuration
    /// error for this profile only.
    pub fn resolve(
        profile: Profile,
        config: &Config,
        secrets: &Secrets,
        model_override: Option<&str>,
    ) -> Result<Self, TchatError> {
        let provider = profile.provider();
        let overrides = config.profile_override(profile);

        let api_key = secrets
            .require(provider.key_env(), profile.name())?
            .to_string();

        let base_url = overrides
            .and_then(|o| o.base_url.clone())
            .unwrap_or_else(|| secrets.get_or(provider.base_url_env(), provider.default_base_url()));

        let model = model_override
            .map(str::to_string)
            .or_else(|| overrides.and_then(|o| o.model.clone()))
            .unwrap_or_else(|| secrets.get_or(profile.model_env(), profile.default_model()));

        let tool_mode = overrides
            .and_then(|o| o.tool_mode)
            .unwrap_or_else(|| profile.default_tool_mode());

        Ok(Self {
            profile,
            base_url,
            model,
            api_key,
            tool_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProfileOverride;
    use std::collections::HashMap;

    fn secrets(pairs: &[(&str, &str)]) -> Secrets {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Secrets::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn profile_lookup_is_case_insensitive_and_fails_fast() {
        assert_eq!(
            "deepseek-chat-v3".parse::<Profile>().unwrap(),
            Profile::DeepSeekChat
        );
        let err = "gpt-5".parse::<Profile>().unwrap_err();
        assert!(matches!(err, TchatError::Config(m) if m.contains("Gemini-2.0-flash")));
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let err = ProfileSettings::resolve(
            Profile::MetaLlama,
            &Config::default(),
            &secrets(&[("GEMINI_API_KEY", "g")]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, TchatError::Config(m) if m.contains("TOGETHER_API_KEY")));
    }

    #[test]
    fn resolution_order() {
        let env = secrets(&[
            ("TOGETHER_API_KEY", "t-key"),
            ("TOGETHER_MODEL1", "env-model"),
            ("TOGETHER_BASE_URL", "http://env"),
        ]);

        let settings =
            ProfileSettings::resolve(Profile::Exaone, &Config::default(), &env, None).unwrap();
        assert_eq!(settings.model, "env-model");
        assert_eq!(settings.base_url, "http://env");
        assert_eq!(settings.tool_mode, ToolMode::Prompt);

        let mut config = Config::default();
        config.profiles.insert(
            "EXAONE-3.5-32b".to_string(),
            ProfileOverride {
                model: Some("file-model".into()),
                base_url: None,
                tool_mode: Some(ToolMode::Native),
            },
        );
        let settings = ProfileSettings::resolve(Profile::Exaone, &config, &env, None).unwrap();
        assert_eq!(settings.model, "file-model");
        assert_eq!(settings.tool_mode, ToolMode::Native);

        let settings =
            ProfileSettings::resolve(Profile::Exaone, &config, &env, Some("cli-model")).unwrap();
        assert_eq!(settings.model, "cli-model");
    }
}
