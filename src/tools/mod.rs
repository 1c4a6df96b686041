use crate::config::{Config, Secrets};
use crate::core::error::TchatError;
use crate::providers::{LLMProvider, ToolCall};
use crate::utils::text::truncate_chars;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod assistants;
pub mod currency;
pub mod developer;
pub mod geolocation;
pub mod joke;
pub mod news;
pub mod weather;

/// Upper bound on the text a tool may feed back into the conversation.
pub const MAX_TOOL_RESULT_CHARS: usize = 4000;

/// What the model is told about a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Read-only view of the session a tool runs in.
pub struct ToolContext<'a> {
    pub provider: &'a dyn LLMProvider,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn call(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<String, TchatError>;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Result of one tool invocation as it enters the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

pub struct ToolSet {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register every built-in tool whose credentials are present. Tools
    /// missing a key are skipped with a warning.
    pub fn builtin(config: &Config, secrets: &Secrets) -> Result<Self, TchatError> {
        let http = Client::builder()
            .connect_timeout(config.timeouts.connect())
            .timeout(config.timeouts.tool())
            .build()?;

        let mut tool_set = ToolSet::new();
        let keyed: Vec<Result<Arc<dyn Tool>, TchatError>> = vec![
            weather::WeatherTool::from_secrets(http.clone(), secrets).map(as_tool),
            news::NewsTool::from_secrets(http.clone(), secrets).map(as_tool),
            currency::CurrencyTool::from_secrets(http.clone(), secrets).map(as_tool),
            geolocation::GeolocationTool::from_secrets(http.clone(), secrets).map(as_tool),
        ];
        for tool in keyed {
            match tool {
                Ok(tool) => tool_set.add_tool(tool),
                Err(e) => warn!("tool disabled: {}", e),
            }
        }

        tool_set.add_tool(Arc::new(joke::JokeTool::from_secrets(http, secrets)));
        tool_set.add_tool(Arc::new(developer::DeveloperInfoTool::new(
            config.developer.clone(),
        )));
        for kind in assistants::AssistantKind::ALL {
            tool_set.add_tool(Arc::new(assistants::AssistantTool::new(kind)));
        }

        Ok(tool_set)
    }

    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.values().cloned().collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run one call. An unregistered name is `UnknownTool`; a failing tool
    /// is folded into an error-tagged output so the model can react to it.
    pub async fn call_tool(
        &self,
        call: &ToolCall,
        ctx: &ToolContext<'_>,
    ) -> Result<ToolOutput, TchatError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| TchatError::UnknownTool(call.name.clone()))?;

        debug!(tool = %call.name, arguments = %call.arguments, "calling tool");
        let output = match tool.call(&call.arguments, ctx).await {
            Ok(content) => ToolOutput {
                content: truncate_chars(&content, MAX_TOOL_RESULT_CHARS),
                is_error: false,
            },
            Err(e) => {
                warn!(tool = %call.name, "tool failed: {}", e);
                ToolOutput {
                    content: truncate_chars(&e.to_string(), MAX_TOOL_RESULT_CHARS),
                    is_error: true,
                }
            }
        };
        Ok(output)
    }
}

impl Default for ToolSet {
    fn default() -> Self {
        Self::new()
    }
}

fn as_tool<T: Tool + 'static>(tool: T) -> Arc<dyn Tool> {
    Arc::new(tool)
}

/// JSON schema for an object of string parameters: `(name, description, required)`.
pub fn string_params(params: &[(&str, &str, bool)]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, description, is_required) in params {
        properties.insert(
            name.to_string(),
            json!({"type": "string", "description": description}),
        );
        if *is_required {
            required.push(Value::String(name.to_string()));
        }
    }
    json!({"type": "object", "properties": properties, "required": required})
}

pub fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, TchatError> {
    optional_str(args, name)
        .ok_or_else(|| TchatError::Tool(format!("Missing required argument '{}'", name)))
}

pub fn optional_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// One GET to a third-party API, decoded as `T`.
pub async fn get_json<T: DeserializeOwned>(
    http: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, TchatError> {
    let response = http
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                TchatError::Tool("The request timed out".to_string())
            } else {
                TchatError::Tool(format!("Request failed: {}", e.without_url()))
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(TchatError::Tool(format!(
            "API request failed with status code {}",
            status.as_u16()
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| TchatError::Tool(format!("Unreadable API response: {}", e.without_url())))
}
