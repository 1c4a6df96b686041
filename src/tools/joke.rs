use super::{Tool, ToolContext, get_json};
use crate::config::Secrets;
use crate::core::error::TchatError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

const DEFAULT_BASE_URL: &str = "https://v2.jokeapi.dev/joke/Any";

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum JokeResponse {
    Single { joke: String },
    Twopart { setup: String, delivery: String },
}

/// Random joke from JokeAPI. Needs no key.
pub struct JokeTool {
    http: Client,
    base_url: String,
}

impl JokeTool {
    pub fn from_secrets(http: Client, secrets: &Secrets) -> Self {
        Self {
            http,
            base_url: secrets.get_or("JOKE_BASE_URL", DEFAULT_BASE_URL),
        }
    }
}

#[async_trait]
impl Tool for JokeTool {
    fn name(&self) -> &str {
        "joke_teller_tool"
    }

    fn description(&self) -> &str {
        "Fetch a random joke, either a one-liner or a setup and punchline."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn call(&self, _args: &Value, _ctx: &ToolContext<'_>) -> Result<String, TchatError> {
        let joke: JokeResponse =
            get_json(&self.http, &self.base_url, &[("type", "single,twopart")]).await?;

        Ok(match joke {
            JokeResponse::Single { joke } => joke,
            JokeResponse::Twopart { setup, delivery } => format!("{}\n{}", setup, delivery),
        })
    }
}
