mod common;

use common::{ScriptedProvider, secrets, session, text, tool_call};
use serde_json::json;
use std::time::Duration;
use toolchat::config::{Config, Profile};
use toolchat::core::error::TchatError;
use toolchat::dispatch::{Dispatcher, TurnEvent};
use toolchat::guardrails::Guardrails;
use toolchat::providers::Role;
use toolchat::providers::factory::ProviderFactory;
use toolchat::session::Transcript;
use toolchat::tools::ToolSet;
use wiremock::matchers::{any, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn weather_body() -> serde_json::Value {
    json!({
        "location": {"name": "Lahore", "region": "Punjab", "country": "Pakistan", "localtime": "2025-06-01 14:00"},
        "current": {"temp_c": 41.0, "condition": {"text": "Sunny"}, "feelslike_c": 44.2,
                    "wind_kph": 11.2, "wind_dir": "NW", "humidity": 18, "uv": 9.0}
    })
}

fn dispatcher(config: &Config, weather_url: String) -> Dispatcher {
    let secrets = secrets(&[
        ("WEATHER_API_KEY", "w-key".to_string()),
        ("WEATHER_BASE_URL", weather_url),
    ]);
    let tools = ToolSet::builtin(config, &secrets).unwrap();
    Dispatcher::new(tools, Guardrails::disabled(), config.max_tool_rounds)
}

#[tokio::test]
async fn weather_question_runs_the_weather_tool() {
    let weather = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current.json"))
        .and(query_param("q", "Lahore"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_body()))
        .expect(1)
        .mount(&weather)
        .await;

    let provider = ScriptedProvider::new(vec![
        vec![tool_call(
            "call_1",
            "current_weather_tool",
            json!({"location": "Lahore"}),
        )],
        vec![text("It is 41°C and sunny in Lahore right now.")],
    ]);
    let mut session = session(provider.clone());
    let mut events = Vec::new();

    let answer = dispatcher(&Config::default(), weather.uri())
        .run_turn(&mut session, "What's the weather in Lahore?", &mut events)
        .await
        .unwrap();
    assert!(answer.contains("41°C"));

    let tool_message = &session.messages()[2];
    assert_eq!(tool_message.role, Role::Tool);
    assert!(tool_message.content.starts_with("Current weather in Lahore, Punjab, Pakistan"));

    // the second request carried the tool result back to the model
    let requests = provider.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].last().unwrap().role, Role::Tool);

    assert!(events.iter().any(|e| matches!(
        e,
        TurnEvent::ToolResult { name, output } if name == "current_weather_tool" && !output.is_error
    )));
}

#[tokio::test]
async fn unregistered_tool_aborts_the_turn() {
    let provider = ScriptedProvider::new(vec![vec![tool_call("call_1", "launch_rocket", json!({}))]]);
    let mut session = session(provider);

    let err = dispatcher(&Config::default(), "http://127.0.0.1:9".to_string())
        .run_turn(&mut session, "launch it", &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TchatError::UnknownTool(name) if name == "launch_rocket"));

    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].role, Role::User);
}

#[tokio::test]
async fn tool_timeout_is_reported_and_next_turn_works() {
    let weather = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(weather_body())
                .set_delay(Duration::from_millis(2500)),
        )
        .mount(&weather)
        .await;

    let mut config = Config::default();
    config.timeouts.tool_secs = 1;
    let dispatcher = dispatcher(&config, weather.uri());

    let provider = ScriptedProvider::new(vec![
        vec![tool_call(
            "call_1",
            "current_weather_tool",
            json!({"location": "Lahore"}),
        )],
        vec![text("Sorry, the weather service is not responding.")],
    ]);
    let mut session = session(provider.clone());
    let mut events = Vec::new();

    dispatcher
        .run_turn(&mut session, "Weather in Lahore?", &mut events)
        .await
        .unwrap();
    let tool_message = &session.messages()[2];
    assert_eq!(tool_message.role, Role::Tool);
    assert_eq!(tool_message.content, "Tool error: The request timed out");
    assert!(events.iter().any(|e| matches!(
        e,
        TurnEvent::ToolResult { output, .. } if output.is_error
    )));

    provider.push_reply(vec![text("Hello again!")]);
    let answer = dispatcher
        .run_turn(&mut session, "hi", &mut Vec::new())
        .await
        .unwrap();
    assert_eq!(answer, "Hello again!");
    assert_eq!(session.messages().len(), 6);
}

#[tokio::test]
async fn missing_key_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let factory = ProviderFactory::new(
        Config::default(),
        secrets(&[("GEMINI_BASE_URL", server.uri())]),
        None,
    )
    .unwrap();
    let err = factory.create(Profile::GeminiFlash).err().unwrap();
    assert!(matches!(err, TchatError::Config(m) if m.contains("GEMINI_API_KEY")));
}

#[tokio::test]
async fn transcript_round_trip_keeps_order() {
    let provider = ScriptedProvider::new(vec![
        vec![text("Hi! How can I help?")],
        vec![text("Here is a joke.")],
    ]);
    let mut session = session(provider);
    let dispatcher = Dispatcher::new(ToolSet::new(), Guardrails::disabled(), 8);
    dispatcher
        .run_turn(&mut session, "hello", &mut Vec::new())
        .await
        .unwrap();
    dispatcher
        .run_turn(&mut session, "tell me a joke", &mut Vec::new())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = session.default_transcript_path(dir.path());
    let written = session.finish(&path).unwrap();

    let pairs: Vec<(Role, String)> = Transcript::load(&written)
        .unwrap()
        .messages()
        .iter()
        .map(|m| (m.role, m.content.clone()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            (Role::User, "hello".to_string()),
            (Role::Assistant, "Hi! How can I help?".to_string()),
            (Role::User, "tell me a joke".to_string()),
            (Role::Assistant, "Here is a joke.".to_string()),
        ]
    );
}

/// Full path through the OpenAI-compatible adapter: a streamed tool call,
/// the weather API, then a streamed answer.
#[tokio::test]
async fn together_profile_streams_tool_call_and_answer() {
    let weather = MockServer::start().await;
    Mock::given(path("/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weather_body()))
        .mount(&weather)
        .await;

    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("\"role\":\"tool\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Sunny, \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"41°C.\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n"
        )))
        .expect(1)
        .mount(&llm)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_a\",\"function\":{\"name\":\"current_weather_tool\",\"arguments\":\"{\\\"loca\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\"tion\\\": \\\"Lahore\\\"}\"}}]},\"finish_reason\":\"tool_calls\"}]}\n\n",
            "data: [DONE]\n\n"
        )))
        .expect(1)
        .mount(&llm)
        .await;

    let secrets = secrets(&[
        ("TOGETHER_API_KEY", "t-key".to_string()),
        ("TOGETHER_BASE_URL", llm.uri()),
        ("WEATHER_API_KEY", "w-key".to_string()),
        ("WEATHER_BASE_URL", weather.uri()),
    ]);
    let config = Config::default();
    let factory = ProviderFactory::new(config.clone(), secrets.clone(), None).unwrap();
    let dispatcher = Dispatcher::new(
        ToolSet::builtin(&config, &secrets).unwrap(),
        Guardrails::disabled(),
        config.max_tool_rounds,
    );

    let mut session = toolchat::session::Session::new(factory.create(Profile::MetaLlama).unwrap());
    let answer = dispatcher
        .run_turn(&mut session, "What's the weather in Lahore?", &mut Vec::new())
        .await
        .unwrap();
    assert_eq!(answer, "Sunny, 41°C.");

    let assistant_call = &session.messages()[1];
    assert_eq!(assistant_call.tool_calls[0].id, "call_a");
    assert_eq!(assistant_call.tool_calls[0].arguments, json!({"location": "Lahore"}));
}
