use crate::config::ToolMode;
use crate::core::error::TchatError;
use crate::guardrails::Guardrails;
use crate::providers::{ChatRequest, Fragment, Message, ToolCall};
use crate::session::Session;
use crate::tools::{ToolContext, ToolOutput, ToolSchema, ToolSet};
use futures::StreamExt;
use handoff::LanguageAgent;
use tracing::debug;

pub mod handoff;
pub mod text_protocol;

pub const BASE_INSTRUCTIONS: &str = "You are a helpful assistant. Use the available tools when \
they help answer the question, and answer in the language the user writes in.";

/// Where a turn is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Streaming,
    ToolPending,
    Done,
    Failed,
}

/// What the UI is told while a turn runs.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    State(TurnState),
    Text(String),
    ToolCall(ToolCall),
    ToolResult { name: String, output: ToolOutput },
    Handoff(LanguageAgent),
    Error(String),
}

pub trait EventSink: Send {
    fn emit(&mut self, event: TurnEvent);
}

impl EventSink for Vec<TurnEvent> {
    fn emit(&mut self, event: TurnEvent) {
        self.push(event);
    }
}

/// Holds back prompt-mode replies that look like a JSON tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Undecided,
    Open,
    Held,
}

/// Drives one user turn: stream the reply, run requested tools, and feed
/// their results back until the model answers in plain text.
pub struct Dispatcher {
    tools: ToolSet,
    guardrails: Guardrails,
    max_tool_rounds: usize,
}

impl Dispatcher {
    pub fn new(tools: ToolSet, guardrails: Guardrails, max_tool_rounds: usize) -> Self {
        Self {
            tools,
            guardrails,
            max_tool_rounds,
        }
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Tools offered while `agent` is answering: the registered tools plus a
    /// handoff to every other language agent.
    pub fn offered_tools(&self, agent: Option<LanguageAgent>) -> Vec<ToolSchema> {
        let mut schemas = self.tools.schemas();
        schemas.extend(
            LanguageAgent::ALL
                .into_iter()
                .filter(|a| Some(*a) != agent)
                .map(|a| a.schema()),
        );
        schemas
    }

    /// System instruction for a session in `mode` answered by `agent`.
    pub fn system_prompt(&self, mode: ToolMode, agent: Option<LanguageAgent>) -> String {
        let base = agent.map_or(BASE_INSTRUCTIONS, |a| a.instructions());
        match mode {
            ToolMode::Prompt => format!(
                "{}\n\n{}",
                base,
                text_protocol::instructions(&self.offered_tools(agent))
            ),
            ToolMode::Native => base.to_string(),
        }
    }

    fn is_known(&self, name: &str) -> bool {
        self.tools.contains(name) || LanguageAgent::from_tool_name(name).is_some()
    }

    /// Run one turn. On failure an `Error` event is emitted and the error is
    /// returned; the session stays usable for the next turn.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        input: &str,
        sink: &mut dyn EventSink,
    ) -> Result<String, TchatError> {
        let result = self.drive(session, input, sink).await;
        match &result {
            Ok(_) => sink.emit(TurnEvent::State(TurnState::Done)),
            Err(e) => {
                debug!(session = session.id(), "turn failed: {}", e);
                sink.emit(TurnEvent::Error(e.to_string()));
                sink.emit(TurnEvent::State(TurnState::Failed));
            }
        }
        sink.emit(TurnEvent::State(TurnState::Idle));
        result
    }

    async fn drive(
        &self,
        session: &mut Session,
        input: &str,
        sink: &mut dyn EventSink,
    ) -> Result<String, TchatError> {
        let provider = session.provider();
        let mode = session.tool_mode();
        let native = mode == ToolMode::Native;

        session.append(Message::user(input));
        self.guardrails.check_input(provider.as_ref(), input).await?;

        for round in 0..=self.max_tool_rounds {
            // a handoff in the previous round changes both
            let agent = session.agent();
            let system = self.system_prompt(mode, agent);
            let schemas = if native {
                self.offered_tools(agent)
            } else {
                Vec::new()
            };

            sink.emit(TurnEvent::State(TurnState::Streaming));
            debug!(
                provider = provider.name(),
                model = provider.model(),
                round,
                messages = session.messages().len(),
                "sending request"
            );

            let request = ChatRequest::new(session.messages())
                .with_system(&system)
                .with_tools(&schemas);
            let mut stream = provider.send(&request).await?;

            let mut text = String::new();
            let mut calls = Vec::new();
            let mut gate = if native { Gate::Open } else { Gate::Undecided };
            while let Some(fragment) = stream.next().await {
                match fragment? {
                    Fragment::Text(chunk) => {
                        text.push_str(&chunk);
                        match gate {
                            Gate::Open => sink.emit(TurnEvent::Text(chunk)),
                            Gate::Held => {}
                            Gate::Undecided if text.trim().is_empty() => {}
                            Gate::Undecided if text_protocol::may_be_tool_call(&text) => {
                                gate = Gate::Held;
                            }
                            Gate::Undecided => {
                                gate = Gate::Open;
                                sink.emit(TurnEvent::Text(text.clone()));
                            }
                        }
                    }
                    Fragment::ToolCall(call) => calls.push(call),
                }
            }

            if !native {
                let id = format!("prompt-call-{}", round + 1);
                calls.extend(text_protocol::parse_tool_call(&text, id));
            }

            if calls.is_empty() {
                if gate == Gate::Held {
                    sink.emit(TurnEvent::Text(text.clone()));
                }
                self.guardrails
                    .check_output(provider.as_ref(), &text)
                    .await?;
                session.append(Message::assistant(text.clone()));
                return Ok(text);
            }

            if round == self.max_tool_rounds {
                break;
            }

            sink.emit(TurnEvent::State(TurnState::ToolPending));
            if let Some(unknown) = calls.iter().find(|c| !self.is_known(&c.name)) {
                return Err(TchatError::UnknownTool(unknown.name.clone()));
            }

            if native {
                session.append(Message::assistant_with_tool_calls(text, calls.clone()));
            } else {
                session.append(Message::assistant(text));
            }

            let ctx = ToolContext {
                provider: provider.as_ref(),
            };
            for call in calls {
                let output = match LanguageAgent::from_tool_name(&call.name) {
                    Some(agent) => {
                        session.hand_off(Some(agent));
                        sink.emit(TurnEvent::Handoff(agent));
                        ToolOutput {
                            content: agent.handoff_result(),
                            is_error: false,
                        }
                    }
                    None => {
                        sink.emit(TurnEvent::ToolCall(call.clone()));
                        let output = self.tools.call_tool(&call, &ctx).await?;
                        sink.emit(TurnEvent::ToolResult {
                            name: call.name.clone(),
                            output: output.clone(),
                        });
                        output
                    }
                };
                session.append(Message::tool_result(&call, output.content, native));
            }
        }

        Err(TchatError::Provider(format!(
            "Model kept requesting tools after {} rounds",
            self.max_tool_rounds
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GuardrailConfig, Profile};
    use crate::providers::factory::BoundProvider;
    use crate::providers::{FragmentStream, LLMProvider, Role};
    use crate::guardrails::Check;
    use crate::tools::{Tool, required_str, string_params};
    use async_trait::async_trait;
    use futures::stream;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays canned replies, one per request, and records each request's
    /// tools and system instruction.
    struct Scripted {
        replies: Mutex<VecDeque<Vec<Fragment>>>,
        saw_tools: Mutex<Vec<usize>>,
        saw_system: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Vec<Fragment>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                saw_tools: Mutex::new(Vec::new()),
                saw_system: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        async fn send(&self, request: &ChatRequest<'_>) -> Result<FragmentStream, TchatError> {
            request.validate()?;
            self.saw_tools.lock().unwrap().push(request.tools.len());
            self.saw_system
                .lock()
                .unwrap()
                .push(request.system.unwrap_or_default().to_string());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TchatError::Provider("script exhausted".into()))?;
            Ok(Box::pin(stream::iter(reply.into_iter().map(Ok))))
        }
    }

    struct Upper;

    #[async_trait]
    impl Tool for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Uppercase text"
        }

        fn parameters_schema(&self) -> Value {
            string_params(&[("text", "Text", true)])
        }

        async fn call(&self, args: &Value, _ctx: &ToolContext<'_>) -> Result<String, TchatError> {
            Ok(required_str(args, "text")?.to_uppercase())
        }
    }

    fn dispatcher(max_tool_rounds: usize) -> Dispatcher {
        let mut tools = ToolSet::new();
        tools.add_tool(Arc::new(Upper));
        Dispatcher::new(tools, Guardrails::disabled(), max_tool_rounds)
    }

    fn session(provider: Arc<Scripted>, tool_mode: ToolMode) -> Session {
        Session::new(BoundProvider {
            profile: Profile::GeminiFlash,
            tool_mode,
            provider,
        })
    }

    fn call(name: &str, args: Value) -> Fragment {
        Fragment::ToolCall(ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: args,
        })
    }

    fn text(s: &str) -> Fragment {
        Fragment::Text(s.into())
    }

    fn states(events: &[TurnEvent]) -> Vec<TurnState> {
        events
            .iter()
            .filter_map(|e| match e {
                TurnEvent::State(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn native_tool_round_trip() {
        let provider = Scripted::new(vec![
            vec![call("upper", json!({"text": "hi"}))],
            vec![text("It says "), text("HI.")],
        ]);
        let mut session = session(provider.clone(), ToolMode::Native);
        let mut events = Vec::new();

        let answer = dispatcher(8)
            .run_turn(&mut session, "shout hi", &mut events)
            .await
            .unwrap();
        assert_eq!(answer, "It says HI.");

        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(session.messages()[2].content, "HI");
        assert_eq!(session.messages()[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(
            states(&events),
            vec![
                TurnState::Streaming,
                TurnState::ToolPending,
                TurnState::Streaming,
                TurnState::Done,
                TurnState::Idle
            ]
        );
        // upper plus the two language handoffs
        assert_eq!(*provider.saw_tools.lock().unwrap(), vec![3, 3]);
    }

    #[tokio::test]
    async fn unknown_tool_fails_without_touching_transcript() {
        let provider = Scripted::new(vec![vec![call("teleport", json!({}))]]);
        let mut session = session(provider, ToolMode::Native);
        let mut events = Vec::new();

        let err = dispatcher(8)
            .run_turn(&mut session, "beam me up", &mut events)
            .await
            .unwrap_err();
        assert!(matches!(err, TchatError::UnknownTool(n) if n == "teleport"));
        assert_eq!(session.messages().len(), 1);
        assert!(events.contains(&TurnEvent::Error("Unknown tool: teleport".into())));
        assert_eq!(states(&events).last(), Some(&TurnState::Idle));
    }

    #[tokio::test]
    async fn prompt_mode_parses_text_calls_and_hides_them() {
        let provider = Scripted::new(vec![
            vec![text("{\"tool\": \"upper\", "), text("\"arguments\": {\"text\": \"ok\"}}")],
            vec![text("Done: OK")],
        ]);
        let mut session = session(provider.clone(), ToolMode::Prompt);
        let mut events = Vec::new();

        let answer = dispatcher(8)
            .run_turn(&mut session, "shout ok", &mut events)
            .await
            .unwrap();
        assert_eq!(answer, "Done: OK");

        let shown: Vec<&TurnEvent> = events
            .iter()
            .filter(|e| matches!(e, TurnEvent::Text(_)))
            .collect();
        assert_eq!(shown, vec![&TurnEvent::Text("Done: OK".into())]);

        let tool_msg = &session.messages()[2];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_call_id, None);
        assert!(session.messages()[1].tool_calls.is_empty());
        assert_eq!(*provider.saw_tools.lock().unwrap(), vec![0, 0]);
    }

    #[tokio::test]
    async fn tool_rounds_are_bounded() {
        let looping = (0..3)
            .map(|_| vec![call("upper", json!({"text": "again"}))])
            .collect();
        let mut session = session(Scripted::new(looping), ToolMode::Native);

        let err = dispatcher(2)
            .run_turn(&mut session, "loop", &mut Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TchatError::Provider(m) if m.contains("after 2 rounds")));
    }

    #[tokio::test]
    async fn provider_failure_keeps_session_usable() {
        let provider = Scripted::new(Vec::new());
        let mut session = session(provider.clone(), ToolMode::Native);
        let dispatcher = dispatcher(8);

        let err = dispatcher
            .run_turn(&mut session, "one", &mut Vec::new())
            .await
            .unwrap_err();
        assert!(err.is_turn_fatal());

        provider
            .replies
            .lock()
            .unwrap()
            .push_back(vec![text("two")]);
        let answer = dispatcher
            .run_turn(&mut session, "two?", &mut Vec::new())
            .await
            .unwrap();
        assert_eq!(answer, "two");

        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn prompt_mode_prose_mentioning_tool_key_is_an_answer() {
        let reply = "Sure. In the YAML, set \"tool\": \"hammer\" under the build key.";
        let provider = Scripted::new(vec![vec![text(reply)]]);
        let mut session = session(provider, ToolMode::Prompt);
        let mut events = Vec::new();

        let answer = dispatcher(8)
            .run_turn(&mut session, "how do I pick the build tool?", &mut events)
            .await
            .unwrap();
        assert_eq!(answer, reply);

        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert!(!states(&events).contains(&TurnState::ToolPending));
    }

    #[tokio::test]
    async fn handoff_switches_to_the_language_agent() {
        let provider = Scripted::new(vec![
            vec![call(LanguageAgent::Urdu.tool_name(), json!({}))],
            vec![text("جی، میں حاضر ہوں۔")],
            vec![text("شکریہ!")],
        ]);
        let mut session = session(provider.clone(), ToolMode::Native);
        let dispatcher = dispatcher(8);
        let mut events = Vec::new();

        dispatcher
            .run_turn(&mut session, "kya aap Urdu mein baat kar sakte hain?", &mut events)
            .await
            .unwrap();
        assert_eq!(session.agent(), Some(LanguageAgent::Urdu));
        assert!(events.contains(&TurnEvent::Handoff(LanguageAgent::Urdu)));
        assert!(!events.iter().any(|e| matches!(e, TurnEvent::ToolCall(_))));
        assert_eq!(session.messages()[2].content, r#"{"assistant":"UrduAgent"}"#);

        // the agent keeps answering on the next turn
        dispatcher
            .run_turn(&mut session, "shukriya", &mut Vec::new())
            .await
            .unwrap();

        let systems = provider.saw_system.lock().unwrap().clone();
        assert_eq!(systems[0], BASE_INSTRUCTIONS);
        assert_eq!(systems[1], LanguageAgent::Urdu.instructions());
        assert_eq!(systems[2], LanguageAgent::Urdu.instructions());
        // no handoff to the agent already answering
        assert_eq!(*provider.saw_tools.lock().unwrap(), vec![3, 2, 2]);
    }

    #[tokio::test]
    async fn flagged_answer_fails_the_turn_and_is_not_kept() {
        let clean = r#"{"flagged": false, "is_developer_context": false, "reasoning": "fine"}"#;
        let flagged = r#"{"flagged": true, "is_developer_context": false, "reasoning": "phone number"}"#;
        let mut replies = vec![
            vec![text("Sure, call Ali at 0300-1234567.")],
            vec![text(clean)],
            vec![text(flagged)],
            vec![text("Hello!")],
        ];
        replies.extend((0..Check::OUTPUT.len()).map(|_| vec![text(clean)]));
        let provider = Scripted::new(replies);
        let mut session = session(provider, ToolMode::Native);

        let mut tools = ToolSet::new();
        tools.add_tool(Arc::new(Upper));
        let guardrails = Guardrails::new(&GuardrailConfig {
            input: false,
            output: true,
        });
        let dispatcher = Dispatcher::new(tools, guardrails, 8);
        let mut events = Vec::new();

        let err = dispatcher
            .run_turn(&mut session, "what is Ali's number?", &mut events)
            .await
            .unwrap_err();
        assert!(matches!(err, TchatError::Guardrail(m) if m.contains("personal information")));
        assert_eq!(states(&events).last(), Some(&TurnState::Idle));
        assert!(states(&events).contains(&TurnState::Failed));
        assert_eq!(session.messages().len(), 1);

        let answer = dispatcher
            .run_turn(&mut session, "hi", &mut Vec::new())
            .await
            .unwrap();
        assert_eq!(answer, "Hello!");
        let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
    }
}
