use super::{Tool, ToolContext, optional_str, required_str, string_params};
use crate::core::error::TchatError;
use crate::providers::{ChatRequest, Message};
use async_trait::async_trait;
use serde_json::Value;

/// Tools that hand a task to the session's own model under a fixed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantKind {
    EasyWriter,
    EmailComposer,
    Translator,
    PromptEngineer,
    CodeDebugger,
}

impl AssistantKind {
    pub const ALL: [AssistantKind; 5] = [
        AssistantKind::EasyWriter,
        AssistantKind::EmailComposer,
        AssistantKind::Translator,
        AssistantKind::PromptEngineer,
        AssistantKind::CodeDebugger,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AssistantKind::EasyWriter => "EasyWriter",
            AssistantKind::EmailComposer => "ProfessionalEmailComposer",
            AssistantKind::Translator => "LanguageTranslator",
            AssistantKind::PromptEngineer => "PromptEngineer",
            AssistantKind::CodeDebugger => "CodeDebugger",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            AssistantKind::EasyWriter => {
                "Easily generate content based on user-provided requirements and topics."
            }
            AssistantKind::EmailComposer => {
                "Compose a well-structured email with a subject line and sign-off from the user's notes."
            }
            AssistantKind::Translator => {
                "Translate any language into the desired language of the user."
            }
            AssistantKind::PromptEngineer => {
                "A senior prompt engineer who crafts optimized prompts based on user requirements."
            }
            AssistantKind::CodeDebugger => "A specialized tool for debugging any code.",
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            AssistantKind::EasyWriter => {
                "You write easy-to-read content that follows the requirements and topic given by the user."
            }
            AssistantKind::EmailComposer => {
                "Compose well-structured emails from user inputs. Adjust tone (formal or informal), \
                 add a subject line, and end with a custom sign-off."
            }
            AssistantKind::Translator => {
                "Translate text from one language to another while preserving meaning, tone and context. \
                 Keep cultural and contextual accuracy and translate idioms naturally where possible. \
                 Match the formality of the source. If the source language is not given, detect it. \
                 Reply with the translation only."
            }
            AssistantKind::PromptEngineer => {
                "You are a senior prompt engineer with over a decade of experience in designing highly \
                 effective prompts for language models. Given any topic, craft the clearest and most \
                 effective prompt that will produce high-quality results from the model. Ask clarifying \
                 questions if needed."
            }
            AssistantKind::CodeDebugger => {
                "You are a highly experienced software engineer who debugs code. Analyze the provided \
                 code, identify bugs, errors or potential improvements, and explain your findings \
                 clearly. Work with any programming language unless told otherwise. Keep explanations \
                 concise and suggest specific fixes or refactors. If the language or intent is unclear, \
                 ask for clarification before proceeding."
            }
        }
    }
}

pub struct AssistantTool {
    kind: AssistantKind,
}

impl AssistantTool {
    pub fn new(kind: AssistantKind) -> Self {
        Self { kind }
    }

    fn prompt(&self, args: &Value) -> Result<String, TchatError> {
        let input = required_str(args, "input")?;
        if self.kind != AssistantKind::Translator {
            return Ok(input.to_string());
        }

        let target = optional_str(args, "target_language").unwrap_or("English");
        Ok(match optional_str(args, "source_language") {
            Some(source) => format!("Translate from {} to {}:\n\n{}", source, target, input),
            None => format!("Translate to {}:\n\n{}", target, input),
        })
    }
}

#[async_trait]
impl Tool for AssistantTool {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn description(&self) -> &str {
        self.kind.description()
    }

    fn parameters_schema(&self) -> Value {
        match self.kind {
            AssistantKind::Translator => string_params(&[
                ("input", "The text to translate", true),
                ("target_language", "Language to translate into, e.g. Urdu", false),
                ("source_language", "Language of the text, detected when omitted", false),
            ]),
            _ => string_params(&[("input", "The task and any material it needs", true)]),
        }
    }

    async fn call(&self, args: &Value, ctx: &ToolContext<'_>) -> Result<String, TchatError> {
        let messages = [Message::user(self.prompt(args)?)];
        let request = ChatRequest::new(&messages).with_system(self.kind.instructions());

        ctx.provider
            .get_response(&request)
            .await
            .map_err(|e| TchatError::Tool(format!("{} failed: {}", self.kind.name(), e)))
    }
}
