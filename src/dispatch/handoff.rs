//! Language agents the assistant can hand a conversation to. A handoff is
//! offered to the model as a parameterless tool; calling it swaps the
//! session's instructions for the agent's until the user switches back.

use crate::core::error::TchatError;
use crate::tools::ToolSchema;
use serde_json::json;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageAgent {
    Urdu,
    English,
}

impl LanguageAgent {
    pub const ALL: [LanguageAgent; 2] = [LanguageAgent::Urdu, LanguageAgent::English];

    pub fn name(&self) -> &'static str {
        match self {
            LanguageAgent::Urdu => "UrduAgent",
            LanguageAgent::English => "EnglishAgent",
        }
    }

    /// Tool name the model calls to hand off.
    pub fn tool_name(&self) -> &'static str {
        match self {
            LanguageAgent::Urdu => "transfer_to_urdu_agent",
            LanguageAgent::English => "transfer_to_english_agent",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|agent| agent.tool_name() == name)
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            LanguageAgent::Urdu => {
                "You are an autonomous assistant that speaks only Urdu.\n\
                 - Reply in Urdu script whatever language the user writes in. \
                 Roman Urdu (Urdu typed with English letters) is understood and \
                 answered in proper Urdu script.\n\
                 - Be polite and friendly, clear and accurate. Use everyday Urdu \
                 and simple examples where they help.\n\
                 - Ask for clarification in Urdu when a question is vague. Say so \
                 honestly when you do not know.\n\
                 - Use the available tools when they help answer the question.\n\
                 - Only switch to another language when the user explicitly asks."
            }
            LanguageAgent::English => {
                "You are an autonomous assistant that speaks only English.\n\
                 - Reply in English whatever language the user writes in.\n\
                 - Be polite and conversational, clear and accurate. Use simple \
                 examples where they help.\n\
                 - Ask for clarification in English when a question is vague. Say \
                 so honestly when you do not know instead of guessing.\n\
                 - Use the available tools when they help answer the question.\n\
                 - Only switch to another language when the user explicitly asks."
            }
        }
    }

    pub fn schema(&self) -> ToolSchema {
        let description = match self {
            LanguageAgent::Urdu => {
                "Hand the conversation to UrduAgent, an assistant that answers only in \
                 Urdu. Use it when the user writes in Urdu or Roman Urdu or asks for Urdu."
            }
            LanguageAgent::English => {
                "Hand the conversation to EnglishAgent, an assistant that answers only \
                 in English. Use it when the user asks to be answered in English."
            }
        };
        ToolSchema {
            name: self.tool_name().to_string(),
            description: description.to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    /// What the model is told after the handoff went through.
    pub fn handoff_result(&self) -> String {
        json!({ "assistant": self.name() }).to_string()
    }
}

impl fmt::Display for LanguageAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LanguageAgent {
    type Err = TchatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "urdu" | "ur" | "urduagent" => Ok(LanguageAgent::Urdu),
            "english" | "en" | "englishagent" => Ok(LanguageAgent::English),
            other => Err(TchatError::Input(format!(
                "Unknown language '{}' (use urdu, english or auto)",
                other
            ))),
        }
    }
}
