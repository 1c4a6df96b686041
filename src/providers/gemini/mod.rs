use crate::core::error::TchatError;
use crate::providers::{ChatRequest, FragmentStream, LLMProvider};
use async_trait::async_trait;

mod client;
mod types;

pub use client::GeminiClient;

#[derive(Clone)]
pub struct GeminiProvider {
    client: GeminiClient,
}

impl GeminiProvider {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: GeminiClient::new(http, base_url, api_key, model),
        }
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.client.model
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<FragmentStream, TchatError> {
        request.validate()?;
        self.client.generate_content_stream(request).await
    }
}
