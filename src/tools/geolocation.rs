use super::{Tool, ToolContext, get_json, required_str, string_params};
use crate::config::Secrets;
use crate::core::error::TchatError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::net::IpAddr;

const DEFAULT_BASE_URL: &str = "https://ipinfo.io";

#[derive(Deserialize)]
struct IpInfo {
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
    org: Option<String>,
    timezone: Option<String>,
}

/// IP address lookup through ipinfo.io.
pub struct GeolocationTool {
    http: Client,
    base_url: String,
    token: String,
}

impl GeolocationTool {
    pub fn from_secrets(http: Client, secrets: &Secrets) -> Result<Self, TchatError> {
        Ok(Self {
            http,
            token: secrets
                .require("IPINFO_API_TOKEN", "ip_geolocation_tool")?
                .to_string(),
            base_url: secrets.get_or("IPINFO_BASE_URL", DEFAULT_BASE_URL),
        })
    }
}

#[async_trait]
impl Tool for GeolocationTool {
    fn name(&self) -> &str {
        "ip_geolocation_tool"
    }

    fn description(&self) -> &str {
        "Look up the city, region, country, ISP and timezone of an IP address."
    }

    fn parameters_schema(&self) -> Value {
        string_params(&[("ip_address", "The IP address to look up, e.g. 8.8.8.8", true)])
    }

    async fn call(&self, args: &Value, _ctx: &ToolContext<'_>) -> Result<String, TchatError> {
        let ip: IpAddr = required_str(args, "ip_address")?
            .parse()
            .map_err(|_| TchatError::Tool("Not a valid IP address".to_string()))?;

        let url = format!("{}/{}/json", self.base_url.trim_end_matches('/'), ip);
        let info: IpInfo = get_json(&self.http, &url, &[("token", &self.token)]).await?;

        let or = |v: &Option<String>, fallback: &str| v.clone().unwrap_or_else(|| fallback.to_string());
        Ok(format!(
            "IP {} is located in {}, {}, {}.\nISP: {}\nTimezone: {}",
            ip,
            or(&info.city, "Unknown city"),
            or(&info.region, "Unknown region"),
            or(&info.country, "Unknown"),
            or(&info.org, "N/A"),
            or(&info.timezone, "N/A"),
        ))
    }
}
