use crate::core::error::TchatError;
use crate::providers::base_client::{HttpClient, StreamDecoder, sse_data};
use crate::providers::{
    ChatRequest, Fragment, FragmentStream, LLMProvider, Message, Role, ToolCall,
};
use crate::tools::ToolSchema;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatCompletionMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatCompletionTool>,
}

#[derive(Serialize)]
struct ChatCompletionMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ChatCompletionToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Serialize)]
struct ChatCompletionToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatCompletionFunctionCall,
}

#[derive(Serialize)]
struct ChatCompletionFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct ChatCompletionTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatCompletionFunction,
}

#[derive(Serialize)]
struct ChatCompletionFunction {
    name: String,
    description: String,
    parameters: Value,
}

impl ChatCompletionMessage {
    fn text(role: &'static str, content: &str) -> Self {
        Self {
            role,
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

fn convert_message(message: &Message) -> ChatCompletionMessage {
    match message.role {
        Role::System => ChatCompletionMessage::text("system", &message.content),
        Role::User => ChatCompletionMessage::text("user", &message.content),
        Role::Assistant if message.tool_calls.is_empty() => {
            ChatCompletionMessage::text("assistant", &message.content)
        }
        Role::Assistant => ChatCompletionMessage {
            role: "assistant",
            content: (!message.content.is_empty()).then(|| message.content.clone()),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| ChatCompletionToolCall {
                    id: call.id.clone(),
                    kind: "function",
                    function: ChatCompletionFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: None,
        },
        Role::Tool => match &message.tool_call_id {
            Some(id) => ChatCompletionMessage {
                tool_call_id: Some(id.clone()),
                ..ChatCompletionMessage::text("tool", &message.content)
            },
            None => ChatCompletionMessage::text(
                "user",
                &format!(
                    "Tool call result ({}): {}",
                    message.name.as_deref().unwrap_or("tool"),
                    message.content
                ),
            ),
        },
    }
}

fn convert_tool(schema: &ToolSchema) -> ChatCompletionTool {
    ChatCompletionTool {
        kind: "function",
        function: ChatCompletionFunction {
            name: schema.name.clone(),
            description: schema.description.clone(),
            parameters: schema.parameters.clone(),
        },
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<StreamError>,
}

#[derive(Deserialize)]
struct StreamError {
    message: String,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    function: Option<StreamFunctionCall>,
}

#[derive(Deserialize)]
struct StreamFunctionCall {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Default)]
struct PendingToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Decoder for OpenAI-style `chat.completion.chunk` events. Tool call deltas
/// are accumulated per index and released once the choice finishes.
#[derive(Default)]
pub struct OpenAIStreamDecoder {
    pending: BTreeMap<u32, PendingToolCall>,
    done: bool,
}

impl OpenAIStreamDecoder {
    fn flush_tool_calls(&mut self) -> Result<Vec<Fragment>, TchatError> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(index, call)| {
                let arguments = if call.arguments.trim().is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(&call.arguments).map_err(|e| {
                        TchatError::Provider(format!(
                            "Malformed arguments for tool {}: {}",
                            call.name, e
                        ))
                    })?
                };
                Ok(Fragment::ToolCall(ToolCall {
                    id: call.id.unwrap_or_else(|| format!("call_{}", index)),
                    name: call.name,
                    arguments,
                }))
            })
            .collect()
    }
}

impl StreamDecoder for OpenAIStreamDecoder {
    fn decode_line(&mut self, line: &str) -> Result<Vec<Fragment>, TchatError> {
        let Some(data) = sse_data(line) else {
            return Ok(Vec::new());
        };
        if data == "[DONE]" {
            self.done = true;
            return self.flush_tool_calls();
        }

        let chunk: StreamChunk = serde_json::from_str(data).map_err(|e| {
            TchatError::Provider(format!("Failed to parse stream data: {}", e))
        })?;
        if let Some(error) = chunk.error {
            return Err(TchatError::Provider(error.message));
        }

        let mut fragments = Vec::new();
        if let Some(choice) = chunk.choices.into_iter().next() {
            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                fragments.push(Fragment::Text(text));
            }
            for delta in choice.delta.tool_calls.unwrap_or_default() {
                let pending = self.pending.entry(delta.index).or_default();
                if delta.id.is_some() {
                    pending.id = delta.id;
                }
                if let Some(function) = delta.function {
                    if let Some(name) = function.name {
                        pending.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        pending.arguments.push_str(&arguments);
                    }
                }
            }
            if choice.finish_reason.is_some() {
                fragments.extend(self.flush_tool_calls()?);
            }
        }
        Ok(fragments)
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn finish(&mut self) -> Result<Vec<Fragment>, TchatError> {
        self.flush_tool_calls()
    }
}

/// Provider for any endpoint that speaks the OpenAI chat-completions API
/// (TogetherAI, OpenRouter).
#[derive(Clone)]
pub struct OpenAICompatibleProvider {
    client: HttpClient,
    label: String,
    pub model: String,
}

impl OpenAICompatibleProvider {
    pub fn new(
        http: reqwest::Client,
        label: &str,
        base_url: String,
        api_key: String,
        model: String,
        extra_headers: Option<HashMap<String, String>>,
    ) -> Self {
        let auth_header = Some(("Authorization".to_string(), format!("Bearer {}", api_key)));

        Self {
            client: HttpClient::new(http, base_url, auth_header, extra_headers),
            label: label.to_string(),
            model,
        }
    }

    fn build_payload(&self, request: &ChatRequest<'_>) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = request.system {
            messages.push(ChatCompletionMessage::text("system", system));
        }
        messages.extend(request.messages.iter().map(convert_message));

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            stream: true,
            tools: request.tools.iter().map(convert_tool).collect(),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn name(&self) -> &str {
        &self.label
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<FragmentStream, TchatError> {
        request.validate()?;
        let payload = self.build_payload(request);
        let response = self.client.post("chat/completions", &payload).await?;
        Ok(self
            .client
            .stream_response(response, OpenAIStreamDecoder::default()))
    }
}
