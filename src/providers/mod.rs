use crate::core::error::TchatError;
use crate::tools::ToolSchema;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod base_client;
pub mod factory;
pub mod gemini;
pub mod openai_compatible;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A structured request from the model to run one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Result of a tool call. `native` keeps the call id so the provider can
    /// pair it with the request; prompt-mode results carry only the name.
    pub fn tool_result(call: &ToolCall, content: impl Into<String>, native: bool) -> Self {
        Self {
            tool_call_id: native.then(|| call.id.clone()),
            name: Some(call.name.clone()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

/// One incremental piece of a streamed model response.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(String),
    ToolCall(ToolCall),
}

pub type FragmentStream = BoxStream<'static, Result<Fragment, TchatError>>;

#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: Option<&'a str>,
    pub messages: &'a [Message],
    pub tools: &'a [ToolSchema],
}

impl<'a> ChatRequest<'a> {
    pub fn new(messages: &'a [Message]) -> Self {
        Self {
            system: None,
            messages,
            tools: &[],
        }
    }

    pub fn with_system(mut self, system: &'a str) -> Self {
        self.system = Some(system);
        self
    }

    pub fn with_tools(mut self, tools: &'a [ToolSchema]) -> Self {
        self.tools = tools;
        self
    }

    /// The conversation must be non-empty and end on a user or tool turn.
    pub fn validate(&self) -> Result<(), TchatError> {
        match self.messages.last() {
            None => Err(TchatError::Provider(
                "Cannot send an empty message sequence".to_string(),
            )),
            Some(m) if matches!(m.role, Role::User | Role::Tool) => Ok(()),
            Some(m) => Err(TchatError::Provider(format!(
                "Message sequence must end with a user or tool message, not {}",
                m.role.as_str()
            ))),
        }
    }
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Provider label used in logs and status lines
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Start a streamed completion. Fragments arrive in generation order and
    /// the stream ends at the provider's end-of-turn.
    async fn send(&self, request: &ChatRequest<'_>) -> Result<FragmentStream, TchatError>;

    /// Collect the text of a streamed completion, ignoring tool calls.
    async fn get_response(&self, request: &ChatRequest<'_>) -> Result<String, TchatError> {
        let mut stream = self.send(request).await?;
        let mut full_response = String::new();
        while let Some(fragment) = stream.next().await {
            if let Fragment::Text(text) = fragment? {
                full_response.push_str(&text);
            }
        }
        Ok(full_response.trim().to_string())
    }
}
