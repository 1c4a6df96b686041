use std::io;
use thiserror::Error;

/// Unified error type for toolchat
#[derive(Error, Debug)]
pub enum TchatError {
    /// Missing or invalid credentials/settings for one profile or tool
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream LLM call failed or returned malformed data
    #[error("Provider error: {0}")]
    Provider(String),

    /// External API behind a tool failed, timed out or returned bad data
    #[error("Tool error: {0}")]
    Tool(String),

    /// The model asked for a tool that is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A guardrail classifier flagged the input or the answer
    #[error("Guardrail triggered: {0}")]
    Guardrail(String),

    /// User input errors
    #[error("Input error: {0}")]
    Input(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TchatError {
    /// Errors that end the current turn but leave the session usable.
    pub fn is_turn_fatal(&self) -> bool {
        matches!(
            self,
            TchatError::Provider(_) | TchatError::UnknownTool(_) | TchatError::Guardrail(_)
        )
    }
}

impl From<reqwest::Error> for TchatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TchatError::Provider(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            TchatError::Provider(format!("Connection failed: {}", err))
        } else if err.is_status() {
            TchatError::Provider(format!("API returned error status: {}", err))
        } else {
            TchatError::Provider(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for TchatError {
    fn from(err: serde_json::Error) -> Self {
        TchatError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for TchatError {
    fn from(err: serde_yml::Error) -> Self {
        TchatError::Serialization(format!("YAML error: {}", err))
    }
}
