use crate::core::error::TchatError;
use crate::providers::base_client::{HttpClient, StreamDecoder, sse_data};
use crate::providers::gemini::types::*;
use crate::providers::{ChatRequest, Fragment, FragmentStream, Message, Role, ToolCall};
use crate::tools::ToolSchema;
use serde_json::{Value, json};

/// Decoder for `streamGenerateContent?alt=sse` events. Gemini function calls
/// carry no id, so one is assigned per call in stream order.
#[derive(Default)]
pub struct GeminiStreamDecoder {
    calls_seen: usize,
    done: bool,
}

impl StreamDecoder for GeminiStreamDecoder {
    fn decode_line(&mut self, line: &str) -> Result<Vec<Fragment>, TchatError> {
        let Some(data) = sse_data(line) else {
            return Ok(Vec::new());
        };

        let parsed: GeminiResponse = serde_json::from_str(data).map_err(|e| {
            TchatError::Provider(format!("Failed to parse Gemini stream data: {}", e))
        })?;
        if let Some(error) = parsed.error {
            return Err(TchatError::Provider(error.message));
        }

        let mut fragments = Vec::new();
        let Some(candidate) = parsed.candidates.into_iter().next() else {
            return Ok(fragments);
        };

        for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
            if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                fragments.push(Fragment::Text(text));
            }
            if let Some(call) = part.function_call {
                self.calls_seen += 1;
                fragments.push(Fragment::ToolCall(ToolCall {
                    id: format!("gemini-call-{}", self.calls_seen),
                    name: call.name,
                    arguments: if call.args.is_null() { json!({}) } else { call.args },
                }));
            }
        }

        if candidate.finish_reason.is_some() {
            self.done = true;
        }
        Ok(fragments)
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    pub model: String,
    client: HttpClient,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, base_url: String, api_key: String, model: String) -> Self {
        let mut client = HttpClient::new(http, base_url, None, None);

        // Add API key to query params
        client.add_query_param("key", api_key);

        Self { client, model }
    }

    pub async fn generate_content_stream(
        &self,
        request: &ChatRequest<'_>,
    ) -> Result<FragmentStream, TchatError> {
        let payload = build_payload(request);
        let mut client = self.client.clone();
        client.add_query_param("alt", "sse".to_string());
        let response = client
            .post(
                &format!("v1beta/models/{}:streamGenerateContent", self.model),
                &payload,
            )
            .await?;

        Ok(client.stream_response(response, GeminiStreamDecoder::default()))
    }
}

fn build_payload(request: &ChatRequest<'_>) -> GeminiRequest {
    // An explicit instruction wins over system messages in the history
    let system_text = request.system.map(str::to_string).or_else(|| {
        request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone())
    });

    // parallel function calls are answered by one content holding every
    // functionResponse part
    let mut contents: Vec<GeminiContent> = Vec::new();
    let mut after_tool = false;
    for message in request.messages {
        let Some(content) = convert_message(message) else {
            continue;
        };
        let is_tool = message.role == Role::Tool;
        match contents.last_mut() {
            Some(last) if is_tool && after_tool => last.parts.extend(content.parts),
            _ => contents.push(content),
        }
        after_tool = is_tool;
    }

    let tools = if request.tools.is_empty() {
        Vec::new()
    } else {
        vec![GeminiTool {
            function_declarations: request.tools.iter().map(convert_tool).collect(),
        }]
    };

    GeminiRequest {
        contents,
        system_instruction: system_text.map(|text| SystemInstruction {
            parts: vec![GeminiPart::text(text)],
        }),
        tools,
    }
}

fn convert_message(message: &Message) -> Option<GeminiContent> {
    let (role, parts) = match message.role {
        Role::System => return None,
        Role::User => ("user", vec![GeminiPart::text(message.content.clone())]),
        Role::Assistant => {
            let mut parts = Vec::new();
            if !message.content.is_empty() {
                parts.push(GeminiPart::text(message.content.clone()));
            }
            parts.extend(message.tool_calls.iter().map(|call| GeminiPart {
                function_call: Some(GeminiFunctionCall {
                    name: call.name.clone(),
                    args: call.arguments.clone(),
                }),
                ..Default::default()
            }));
            if parts.is_empty() {
                return None;
            }
            ("model", parts)
        }
        Role::Tool => {
            let name = message.name.clone().unwrap_or_else(|| "tool".to_string());
            let part = if message.tool_call_id.is_some() {
                GeminiPart {
                    function_response: Some(GeminiFunctionResponse {
                        name,
                        response: json!({ "content": message.content }),
                    }),
                    ..Default::default()
                }
            } else {
                GeminiPart::text(format!("Tool call result ({}): {}", name, message.content))
            };
            ("user", vec![part])
        }
    };

    Some(GeminiContent {
        parts,
        role: Some(role.to_string()),
    })
}

fn convert_tool(schema: &ToolSchema) -> GeminiFunctionDeclaration {
    // Gemini rejects OBJECT schemas without properties
    let has_properties = schema
        .parameters
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|p| !p.is_empty());

    GeminiFunctionDeclaration {
        name: schema.name.clone(),
        description: schema.description.clone(),
        parameters: has_properties.then(|| schema.parameters.clone()),
    }
}
