use crate::config::{Config, Profile, ProfileSettings, ProviderKind, Secrets, Timeouts, ToolMode};
use crate::core::error::TchatError;
use crate::providers::{
    LLMProvider, gemini::GeminiProvider, openai_compatible::OpenAICompatibleProvider,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const OPENROUTER_REFERER: &str = "https://github.com/toolchat/toolchat";
const OPENROUTER_TITLE: &str = "toolchat";

/// A provider bound to the profile it was created for.
#[derive(Clone)]
pub struct BoundProvider {
    pub profile: Profile,
    pub tool_mode: ToolMode,
    pub provider: Arc<dyn LLMProvider>,
}

/// Builds providers from profiles. Holds only read-only configuration and can
/// be shared between sessions.
pub struct ProviderFactory {
    config: Config,
    secrets: Secrets,
    http: reqwest::Client,
    model_override: Option<String>,
}

impl ProviderFactory {
    pub fn new(
        config: Config,
        secrets: Secrets,
        model_override: Option<String>,
    ) -> Result<Self, TchatError> {
        let http = provider_http_client(&config.timeouts)?;
        Ok(Self {
            config,
            secrets,
            http,
            model_override,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    /// Create the provider for `profile`. Missing credentials fail here,
    /// before any request is made.
    pub fn create(&self, profile: Profile) -> Result<BoundProvider, TchatError> {
        let settings = ProfileSettings::resolve(
            profile,
            &self.config,
            &self.secrets,
            self.model_override.as_deref(),
        )?;
        debug!(?settings, "binding profile");

        let tool_mode = settings.tool_mode;
        let provider: Arc<dyn LLMProvider> = match profile.provider() {
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(
                self.http.clone(),
                settings.base_url,
                settings.api_key,
                settings.model,
            )),
            ProviderKind::Together => Arc::new(OpenAICompatibleProvider::new(
                self.http.clone(),
                ProviderKind::Together.label(),
                settings.base_url,
                settings.api_key,
                settings.model,
                None,
            )),
            ProviderKind::OpenRouter => {
                let mut headers = HashMap::new();
                headers.insert("HTTP-Referer".to_string(), OPENROUTER_REFERER.to_string());
                headers.insert("X-Title".to_string(), OPENROUTER_TITLE.to_string());
                Arc::new(OpenAICompatibleProvider::new(
                    self.http.clone(),
                    ProviderKind::OpenRouter.label(),
                    settings.base_url,
                    settings.api_key,
                    settings.model,
                    Some(headers),
                ))
            }
        };

        Ok(BoundProvider {
            profile,
            tool_mode,
            provider,
        })
    }

    /// Profiles whose credentials are present. Others are reported once.
    pub fn available_profiles(&self) -> Vec<Profile> {
        Profile::ALL
            .into_iter()
            .filter(|profile| {
                match self.secrets.require(profile.provider().key_env(), profile.name()) {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(profile = profile.name(), "profile unavailable: {}", e);
                        false
                    }
                }
            })
            .collect()
    }
}

fn provider_http_client(timeouts: &Timeouts) -> Result<reqwest::Client, TchatError> {
    Ok(reqwest::Client::builder()
        .connect_timeout(timeouts.connect())
        .timeout(timeouts.provider())
        .build()?)
}
