//! Tool calls for models without native function calling: the model is told
//! to answer with a JSON object `{"tool": "...", "arguments": {...}}`, bare or
//! in a fenced block, and the reply text is scanned for it.

use crate::providers::ToolCall;
use crate::tools::ToolSchema;
use regex::Regex;
use serde_json::{Value, json};
use std::fmt::Write;
use std::sync::LazyLock;

static FENCE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\n?(.*?)```"));

/// System instruction block describing the tools and the call format.
pub fn instructions(tools: &[ToolSchema]) -> String {
    let mut text = String::from("You have access to the following tools:\n");
    for tool in tools {
        let _ = writeln!(text, "- {}: {}", tool.name, tool.description);
        if let Some(props) = tool.parameters.get("properties").and_then(Value::as_object) {
            if !props.is_empty() {
                let names: Vec<&str> = props.keys().map(String::as_str).collect();
                let _ = writeln!(text, "  arguments: {}", names.join(", "));
            }
        }
    }
    text.push_str(
        "\nWhen you need a tool, reply with only a JSON object of this form and nothing else:\n\
         {\"tool\": \"tool_name\", \"arguments\": {\"param\": \"value\"}}\n\
         The tool result will be sent back to you as a message starting with \
         \"Tool call result\". Use it to answer the user.",
    );
    text
}

/// The first JSON object found in `text`: the whole text, a fenced block,
/// or the span from the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Option<Value> {
    json_objects(text).next()
}

fn json_objects(text: &str) -> impl Iterator<Item = Value> + '_ {
    let trimmed = text.trim();
    let mut candidates = vec![trimmed];
    if let Some(block) = FENCE
        .as_ref()
        .ok()
        .and_then(|re| re.captures(trimmed))
        .and_then(|caps| caps.get(1))
    {
        candidates.push(block.as_str());
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            candidates.push(&trimmed[start..=end]);
        }
    }

    candidates
        .into_iter()
        .filter_map(|c| serde_json::from_str::<Value>(c.trim()).ok())
        .filter(Value::is_object)
}

/// Detect a tool call in a completed reply. Only a parsed JSON object with a
/// string `tool` field counts. `id` is assigned by the caller since text
/// calls carry none.
pub fn parse_tool_call(text: &str, id: String) -> Option<ToolCall> {
    let object = json_objects(text).find(|v| {
        v.get("tool")
            .and_then(Value::as_str)
            .is_some_and(|name| !name.trim().is_empty())
    })?;

    let name = object.get("tool")?.as_str()?.trim().to_string();
    let arguments = object
        .get("arguments")
        .filter(|v| v.is_object())
        .cloned()
        .unwrap_or_else(|| json!({}));

    Some(ToolCall {
        id,
        name,
        arguments,
    })
}

/// Whether a reply that starts this way may turn out to be a tool call, so
/// it should be held back instead of streamed.
pub fn may_be_tool_call(prefix: &str) -> bool {
    let prefix = prefix.trim_start();
    prefix.starts_with('{') || prefix.starts_with('`')
}
