#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use toolchat::config::{Profile, Secrets, ToolMode};
use toolchat::core::error::TchatError;
use toolchat::providers::factory::BoundProvider;
use toolchat::providers::{ChatRequest, Fragment, FragmentStream, LLMProvider, Message, ToolCall};
use toolchat::session::Session;

/// In-memory provider that replays one scripted reply per request and keeps
/// a copy of every conversation it was sent.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Vec<Fragment>>>,
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Vec<Fragment>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push_reply(&self, reply: Vec<Fragment>) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<FragmentStream, TchatError> {
        request.validate()?;
        self.requests.lock().unwrap().push(request.messages.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TchatError::Provider("no scripted reply left".into()))?;
        Ok(Box::pin(stream::iter(reply.into_iter().map(Ok))))
    }
}

pub fn session(provider: Arc<ScriptedProvider>) -> Session {
    Session::new(BoundProvider {
        profile: Profile::GeminiFlash,
        tool_mode: ToolMode::Native,
        provider,
    })
}

pub fn text(s: &str) -> Fragment {
    Fragment::Text(s.to_string())
}

pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> Fragment {
    Fragment::ToolCall(ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments,
    })
}

pub fn secrets(pairs: &[(&str, String)]) -> Secrets {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Secrets::from_lookup(|key| map.get(key).cloned())
}
