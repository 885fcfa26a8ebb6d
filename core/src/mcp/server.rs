use crate::error::LoopError;
use crate::tools::{WEATHER_TOOL_NAME, WeatherClient, extract_string_arg, weather_tool_spec};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    LoggingLevel, LoggingMessageNotificationParam, PaginatedRequestParam, ServerCapabilities,
    ServerInfo,
};
use rmcp::service::{Peer, RequestContext};
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, warn};

/// What a failed lookup looks like to the caller.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// An error-flagged tool result the model can read.
    #[default]
    Inline,
    /// A request-level error.
    Raise,
}

#[derive(Clone)]
pub struct WeatherServer {
    client: WeatherClient,
    failure_mode: FailureMode,
}

impl WeatherServer {
    pub fn new(client: WeatherClient) -> Self {
        Self {
            client,
            failure_mode: FailureMode::default(),
        }
    }

    pub fn with_failure_mode(mut self, failure_mode: FailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    pub fn tool_definition() -> rmcp::model::Tool {
        let spec = weather_tool_spec();
        let schema = match spec.input_schema {
            Value::Object(map) => map,
            _ => Default::default(),
        };
        rmcp::model::Tool {
            name: spec.name.into(),
            description: Some(spec.description.into()),
            input_schema: Arc::new(schema),
            annotations: None,
            output_schema: None,
        }
    }

    pub async fn get_weather(
        &self,
        arguments: Value,
        peer: Option<&Peer<RoleServer>>,
    ) -> Result<CallToolResult, ErrorData> {
        let city = match extract_string_arg(&arguments, "city") {
            Ok(city) => city,
            Err(e) => {
                return match self.failure_mode {
                    FailureMode::Inline => {
                        Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
                    }
                    FailureMode::Raise => Err(ErrorData::invalid_params(e.to_string(), None)),
                };
            }
        };

        notify(peer, format!("Fetching weather for {city}…")).await;

        match self.client.current_text(&city).await {
            Ok(text) => {
                notify(peer, "Weather data fetched successfully!".to_string()).await;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => {
                let message = format!("Failed to fetch weather data: {e}");
                match self.failure_mode {
                    FailureMode::Inline => Ok(CallToolResult::error(vec![Content::text(message)])),
                    FailureMode::Raise => Err(ErrorData::internal_error(message, None)),
                }
            }
        }
    }
}

async fn notify(peer: Option<&Peer<RoleServer>>, message: String) {
    let Some(peer) = peer else {
        return;
    };
    let param = LoggingMessageNotificationParam {
        level: LoggingLevel::Info,
        logger: Some("weather".to_string()),
        data: json!(message),
    };
    if let Err(e) = peer.notify_logging_message(param).await {
        warn!("failed to send log notification: {e}");
    }
}

impl ServerHandler for WeatherServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Weather lookups backed by OpenWeather. Call get_weather with an English city name."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_logging()
                .build(),
            server_info: Implementation {
                name: "WeatherServer".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            tools: vec![Self::tool_definition()],
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        if request.name != WEATHER_TOOL_NAME {
            return Err(ErrorData::invalid_params(
                LoopError::UnknownTool(request.name.to_string()).to_string(),
                None,
            ));
        }
        info!(tool = %request.name, "tool call received");
        let arguments = Value::Object(request.arguments.unwrap_or_default());
        self.get_weather(arguments, Some(&context.peer)).await
    }
}
