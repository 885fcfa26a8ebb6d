use serde_json::json;
use std::sync::Arc;
use toolloop_core::agent::{AgentLoop, ContextBuilder, ToolRegistry};
use toolloop_core::config::WeatherConfig;
use toolloop_core::mcp::{FailureMode, McpConnections, McpSession, WeatherServer};
use toolloop_core::traits::{ChatRequest, ChatResponse, Provider, Role, ToolCall};
use toolloop_core::{LoopError, WeatherClient};
use rmcp::ServiceExt;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn openweather() -> MockServer {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Beijing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Beijing",
            "weather": [{"description": "晴"}],
            "main": {"temp": 26.3}
        })))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Nowhere"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"cod": "404"})))
        .mount(&upstream)
        .await;
    upstream
}

/// Starts the weather server on one end of an in-memory pipe and connects a session to the other.
async fn connect(upstream: &MockServer, mode: FailureMode) -> McpSession {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let server = WeatherServer::new(WeatherClient::new(WeatherConfig {
        api_key: Some("test".into()),
        base_url: upstream.uri(),
        ..WeatherConfig::default()
    }))
    .with_failure_mode(mode);

    tokio::spawn(async move {
        if let Ok(service) = server.serve(server_io).await {
            let _ = service.waiting().await;
        }
    });

    McpSession::connect_transport("weather", client_io).await.unwrap()
}

#[tokio::test]
async fn lists_and_calls_get_weather() {
    let upstream = openweather().await;
    let session = connect(&upstream, FailureMode::Inline).await;

    let tools = session.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "get_weather");

    let output = session
        .call_tool("get_weather", json!({"city": "Beijing"}))
        .await
        .unwrap();
    assert!(!output.is_error);
    let payload: serde_json::Value = serde_json::from_str(&output.text()).unwrap();
    assert_eq!(payload["main"]["temp"], 26.3);

    session.close().await;
}

#[tokio::test]
async fn failure_modes_differ_by_transport_style() {
    let upstream = openweather().await;

    let inline = connect(&upstream, FailureMode::Inline).await;
    let output = inline
        .call_tool("get_weather", json!({"city": "Nowhere"}))
        .await
        .unwrap();
    assert!(output.is_error);
    assert!(output.text().starts_with("Failed to fetch weather data"));
    inline.close().await;

    let raise = connect(&upstream, FailureMode::Raise).await;
    let err = raise
        .call_tool("get_weather", json!({"city": "Nowhere"}))
        .await
        .unwrap_err();
    assert!(matches!(err, LoopError::UpstreamRequest(_)));
    raise.close().await;
}

#[tokio::test]
async fn missing_city_is_rejected_by_the_server() {
    let upstream = openweather().await;

    let inline = connect(&upstream, FailureMode::Inline).await;
    let output = inline.call_tool("get_weather", json!({})).await.unwrap();
    assert!(output.is_error);
    assert_eq!(output.text(), "'city' is required");
    inline.close().await;

    let raise = connect(&upstream, FailureMode::Raise).await;
    let err = raise.call_tool("get_weather", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("'city' is required"));
    raise.close().await;
}

/// Asks for the weather once, then answers from whatever the tool returned.
struct WeatherAsker {
    seen: Mutex<Vec<Vec<Role>>>,
}

#[async_trait::async_trait]
impl Provider for WeatherAsker {
    fn name(&self) -> &str {
        "weather-asker"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        self.seen
            .lock()
            .await
            .push(request.messages.iter().map(|m| m.role).collect());

        match request.messages.last() {
            Some(last) if last.role == Role::Tool => Ok(ChatResponse::text(format!(
                "It is sunny. ({} bytes of data)",
                last.content.len()
            ))),
            _ => Ok(ChatResponse::with_tool_calls(vec![ToolCall {
                id: "call_1".into(),
                name: "get_weather".into(),
                arguments: r#"{"city":"Beijing"}"#.into(),
            }])),
        }
    }
}

#[tokio::test]
async fn agent_loop_routes_through_remote_tool() {
    let upstream = openweather().await;
    let mut connections = McpConnections::default();
    connections.push(connect(&upstream, FailureMode::Inline).await);

    let mut registry = ToolRegistry::new();
    assert_eq!(connections.register_tools(&mut registry).await.unwrap(), 1);

    let provider = Arc::new(WeatherAsker {
        seen: Mutex::new(vec![]),
    });
    let agent = AgentLoop::new(provider.clone(), ContextBuilder::new(), Arc::new(registry));
    let completion = agent.process("What's the weather in Beijing?").await.unwrap();

    assert!(completion.answer.starts_with("It is sunny."));
    assert_eq!(completion.tool_results.len(), 1);

    let seen = provider.seen.lock().await;
    assert_eq!(
        seen[1],
        vec![Role::System, Role::User, Role::Assistant, Role::Tool]
    );
    drop(seen);

    connections.close().await;
}
