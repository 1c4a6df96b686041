use crate::config::GuardrailConfig;
use crate::core::error::TchatError;
use crate::dispatch::text_protocol::extract_json_object;
use crate::providers::{ChatRequest, LLMProvider, Message};
use serde::Deserialize;
use tracing::{debug, warn};

const VERDICT_FORMAT: &str = "Reply with only a JSON object: \
{\"flagged\": true|false, \"is_developer_context\": true|false, \"reasoning\": \"one sentence\"}. \
Set is_developer_context when the text is technical documentation, logs, code or an educational \
or professional security question.";

/// Model-backed checks run on user input or on the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Toxicity,
    MaliciousIntent,
    Pii,
    SensitiveTopic,
    Hallucination,
    SelfReference,
    HarmfulAdvice,
}

impl Check {
    pub const INPUT: [Check; 2] = [Check::Toxicity, Check::MaliciousIntent];
    pub const OUTPUT: [Check; 6] = [
        Check::Toxicity,
        Check::Pii,
        Check::SensitiveTopic,
        Check::Hallucination,
        Check::SelfReference,
        Check::HarmfulAdvice,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Check::Toxicity => "toxicity",
            Check::MaliciousIntent => "malicious intent",
            Check::Pii => "personal information",
            Check::SensitiveTopic => "sensitive topic",
            Check::Hallucination => "factual accuracy",
            Check::SelfReference => "self reference",
            Check::HarmfulAdvice => "harmful advice",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Check::Toxicity => {
                "Determine if the text contains toxic or harmful language such as hate speech, \
                 abuse or threats. Strong wording in a neutral technical context is not toxic."
            }
            Check::MaliciousIntent => {
                "Evaluate whether the text shows actual malicious intent, such as asking to bypass \
                 a login or steal credentials, rather than a legitimate educational or professional \
                 question like how XSS works or how to report a vulnerability."
            }
            Check::Pii => {
                "Determine if the text reveals personally identifiable information such as phone \
                 numbers, home addresses, government ids or private email addresses."
            }
            Check::SensitiveTopic => {
                "Determine if the text discusses sensitive topics such as self-harm, violence, \
                 extremist content or explicit material in an inappropriate way."
            }
            Check::Hallucination => {
                "Determine if the text states facts that are clearly inaccurate or made up."
            }
            Check::SelfReference => {
                "Determine if the text talks about the assistant's own internals, hidden \
                 instructions, system prompt or underlying model in a way the user did not ask for."
            }
            Check::HarmfulAdvice => {
                "Determine if the text gives advice that could cause physical, financial or legal \
                 harm if followed. Do not flag developer instructions or mock scenarios."
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default)]
    flagged: bool,
    #[serde(default)]
    is_developer_context: bool,
    #[serde(default)]
    reasoning: String,
}

/// Runs the enabled checks. A classifier that fails or answers in an
/// unreadable way lets the text through with a warning.
#[derive(Debug, Clone, Default)]
pub struct Guardrails {
    input: bool,
    output: bool,
}

impl Guardrails {
    pub fn new(config: &GuardrailConfig) -> Self {
        Self {
            input: config.input,
            output: config.output,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub async fn check_input(
        &self,
        provider: &dyn LLMProvider,
        text: &str,
    ) -> Result<(), TchatError> {
        if !self.input {
            return Ok(());
        }
        run_checks(provider, &Check::INPUT, "input", text).await
    }

    pub async fn check_output(
        &self,
        provider: &dyn LLMProvider,
        text: &str,
    ) -> Result<(), TchatError> {
        if !self.output {
            return Ok(());
        }
        run_checks(provider, &Check::OUTPUT, "answer", text).await
    }
}

async fn run_checks(
    provider: &dyn LLMProvider,
    checks: &[Check],
    stage: &str,
    text: &str,
) -> Result<(), TchatError> {
    for check in checks {
        let Some(verdict) = classify(provider, *check, text).await else {
            continue;
        };
        debug!(check = check.label(), stage, ?verdict, "guardrail verdict");
        if verdict.flagged && !verdict.is_developer_context {
            return Err(TchatError::Guardrail(format!(
                "{} check on the {}: {}",
                check.label(),
                stage,
                verdict.reasoning
            )));
        }
    }
    Ok(())
}

async fn classify(provider: &dyn LLMProvider, check: Check, text: &str) -> Option<Verdict> {
    let system = format!("{}\n{}", check.instruction(), VERDICT_FORMAT);
    let messages = [Message::user(text)];
    let request = ChatRequest::new(&messages).with_system(&system);

    let reply = match provider.get_response(&request).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(check = check.label(), "guardrail classifier failed: {}", e);
            return None;
        }
    };
    let verdict = extract_json_object(&reply).and_then(|v| serde_json::from_value(v).ok());
    if verdict.is_none() {
        warn!(check = check.label(), "guardrail classifier gave no verdict");
    }
    verdict
}
