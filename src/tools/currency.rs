use super::{Tool, ToolContext, get_json, required_str, string_params};
use crate::config::Secrets;
use crate::core::error::TchatError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com/v6";

#[derive(Deserialize)]
struct RatesResponse {
    result: String,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

/// Latest exchange rate from exchangerate-api.com.
pub struct CurrencyTool {
    http: Client,
    base_url: String,
    api_key: String,
}

impl CurrencyTool {
    pub fn from_secrets(http: Client, secrets: &Secrets) -> Result<Self, TchatError> {
        Ok(Self {
            http,
            api_key: secrets
                .require("CURRENCY_EXCHANGE_API_KEY", "currency_exchange_tool")?
                .to_string(),
            base_url: secrets.get_or("CURRENCY_EXCHANGE_URL", DEFAULT_BASE_URL),
        })
    }
}

#[async_trait]
impl Tool for CurrencyTool {
    fn name(&self) -> &str {
        "currency_exchange_tool"
    }

    fn description(&self) -> &str {
        "Get the latest exchange rate between two currencies given as ISO codes (e.g. USD, PKR)."
    }

    fn parameters_schema(&self) -> Value {
        string_params(&[
            ("base_currency", "Currency code to convert from, e.g. USD", true),
            ("target_currency", "Currency code to convert to, e.g. EUR", true),
        ])
    }

    async fn call(&self, args: &Value, _ctx: &ToolContext<'_>) -> Result<String, TchatError> {
        let base = required_str(args, "base_currency")?.to_uppercase();
        let target = required_str(args, "target_currency")?.to_uppercase();

        let url = format!(
            "{}/{}/latest/{}",
            self.base_url.trim_end_matches('/'),
            self.api_key,
            base
        );
        let data: RatesResponse = get_json(&self.http, &url, &[]).await?;
        if data.result != "success" {
            return Err(TchatError::Tool(
                "The exchange rate API did not return a successful result".to_string(),
            ));
        }

        Ok(match data.conversion_rates.get(&target) {
            Some(rate) => format!("Exchange rate from {} to {} is {:.4}.", base, target, rate),
            None => format!(
                "Sorry, I couldn't find the exchange rate for '{}'. Please check the currency code.",
                target
            ),
        })
    }
}
