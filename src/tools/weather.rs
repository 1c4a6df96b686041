use super::{Tool, ToolContext, get_json, required_str, string_params};
use crate::config::Secrets;
use crate::core::error::TchatError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

#[derive(Deserialize)]
struct WeatherResponse {
    location: Location,
    current: Current,
}

#[derive(Deserialize)]
struct Location {
    name: String,
    region: String,
    country: String,
    localtime: String,
}

#[derive(Deserialize)]
struct Current {
    temp_c: f64,
    condition: Condition,
    feelslike_c: f64,
    wind_kph: f64,
    wind_dir: String,
    humidity: f64,
    uv: f64,
}

#[derive(Deserialize)]
struct Condition {
    text: String,
}

/// Current conditions from weatherapi.com.
pub struct WeatherTool {
    http: Client,
    base_url: String,
    api_key: String,
}

impl WeatherTool {
    pub fn from_secrets(http: Client, secrets: &Secrets) -> Result<Self, TchatError> {
        Ok(Self {
            http,
            api_key: secrets
                .require("WEATHER_API_KEY", "current_weather_tool")?
                .to_string(),
            base_url: secrets.get_or("WEATHER_BASE_URL", DEFAULT_BASE_URL),
        })
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "current_weather_tool"
    }

    fn description(&self) -> &str {
        "Get the current weather for a city: temperature, conditions, wind, humidity and UV index."
    }

    fn parameters_schema(&self) -> Value {
        string_params(&[("location", "The city to get the weather for", true)])
    }

    async fn call(&self, args: &Value, _ctx: &ToolContext<'_>) -> Result<String, TchatError> {
        let location = required_str(args, "location")?;
        let url = format!("{}/current.json", self.base_url.trim_end_matches('/'));
        let data: WeatherResponse =
            get_json(&self.http, &url, &[("key", &self.api_key), ("q", location)]).await?;

        let (place, now) = (&data.location, &data.current);
        Ok(format!(
            "Current weather in {}, {}, {} as of {} is {}°C ({}), feels like {}°C, wind {} km/h {}, humidity {}% and UV index is {}.",
            place.name,
            place.region,
            place.country,
            place.localtime,
            now.temp_c,
            now.condition.text,
            now.feelslike_c,
            now.wind_kph,
            now.wind_dir,
            now.humidity,
            now.uv
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{ctx, secrets};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool(uri: String, http: Client) -> WeatherTool {
        WeatherTool::from_secrets(
            http,
            &secrets(&[
                ("WEATHER_API_KEY", "w-key".to_string()),
                ("WEATHER_BASE_URL", uri),
            ]),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn formats_current_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/current.json"))
            .and(query_param("key", "w-key"))
            .and(query_param("q", "Lahore"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "location": {"name": "Lahore", "region": "Punjab", "country": "Pakistan", "localtime": "2025-06-01 14:00"},
                "current": {"temp_c": 41.0, "condition": {"text": "Sunny"}, "feelslike_c": 44.2,
                            "wind_kph": 11.2, "wind_dir": "NW", "humidity": 18, "uv": 9.0}
            })))
            .mount(&server)
            .await;

        let text = tool(server.uri(), Client::new())
            .call(&json!({"location": "Lahore"}), &ctx())
            .await
            .unwrap();
        assert!(text.starts_with("Current weather in Lahore, Punjab, Pakistan"));
        assert!(text.contains("41°C (Sunny)"));
    }

    #[tokio::test]
    async fn timeout_is_a_tool_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let http = Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let err = tool(server.uri(), http)
            .call(&json!({"location": "Lahore"}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, TchatError::Tool(m) if m.contains("timed out")));
    }

    #[test]
    fn requires_api_key() {
        let err = WeatherTool::from_secrets(Client::new(), &secrets(&[])).err().unwrap();
        assert!(matches!(err, TchatError::Config(_)));
    }
}
