use super::{Tool, ToolContext, get_json, required_str, string_params};
use crate::config::Secrets;
use crate::core::error::TchatError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Write;

const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2/everything";
const PAGE_SIZE: &str = "3";

#[derive(Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Deserialize)]
struct Article {
    title: String,
    source: Source,
}

#[derive(Deserialize)]
struct Source {
    name: String,
}

/// Latest headlines from newsapi.org.
pub struct NewsTool {
    http: Client,
    base_url: String,
    api_key: String,
}

impl NewsTool {
    pub fn from_secrets(http: Client, secrets: &Secrets) -> Result<Self, TchatError> {
        Ok(Self {
            http,
            api_key: secrets.require("NEWS_API_KEY", "news_update")?.to_string(),
            base_url: secrets.get_or("NEWS_BASE_URL", DEFAULT_BASE_URL),
        })
    }
}

#[async_trait]
impl Tool for NewsTool {
    fn name(&self) -> &str {
        "news_update"
    }

    fn description(&self) -> &str {
        "Fetch the three most recent news headlines about a topic."
    }

    fn parameters_schema(&self) -> Value {
        string_params(&[("topic", "Keyword or topic to search news for", true)])
    }

    async fn call(&self, args: &Value, _ctx: &ToolContext<'_>) -> Result<String, TchatError> {
        let topic = required_str(args, "topic")?;
        let data: NewsResponse = get_json(
            &self.http,
            &self.base_url,
            &[
                ("q", topic),
                ("apiKey", &self.api_key),
                ("pageSize", PAGE_SIZE),
                ("sortBy", "publishedAt"),
            ],
        )
        .await?;

        if data.articles.is_empty() {
            return Ok(format!("Sorry, no recent news found on '{}'.", topic));
        }

        let mut response = format!(
            "Here are the top {} news headlines on '{}':",
            data.articles.len(),
            topic
        );
        for (i, article) in data.articles.iter().enumerate() {
            let _ = write!(
                response,
                "\n{}. {} (Source: {})",
                i + 1,
                article.title,
                article.source.name
            );
        }
        Ok(response)
    }
}
