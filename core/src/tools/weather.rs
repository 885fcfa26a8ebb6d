use crate::config::WeatherConfig;
use crate::error::{LoopError, Result};
use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolOutput, ToolSpec};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{error, info};

pub const WEATHER_TOOL_NAME: &str = "get_weather";
const WEATHER_DESCRIPTION: &str = "Look up the current weather for a city (OpenWeather data). \
Chinese cities must be given by their English name, e.g. \"Beijing\".";

pub fn weather_tool_spec() -> ToolSpec {
    ToolSpec {
        name: WEATHER_TOOL_NAME.to_string(),
        description: WEATHER_DESCRIPTION.to_string(),
        input_schema: json!({
            "type": "object",
            "required": ["city"],
            "properties": {
                "city": {
                    "type": "string",
                    "description": "English name of the city, e.g. 'Beijing'"
                }
            }
        }),
    }
}

/// Thin client for OpenWeather's current-weather endpoint.
#[derive(Clone)]
pub struct WeatherClient {
    client: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Raw OpenWeather payload for `city`. Any non-2xx status is an upstream failure.
    pub async fn current(&self, city: &str) -> Result<Value> {
        let mut query = vec![
            ("q", city),
            ("units", self.config.units.as_str()),
            ("lang", self.config.lang.as_str()),
        ];
        if let Some(key) = self.config.api_key.as_deref() {
            query.push(("appid", key));
        }

        let url = format!("{}/weather", self.config.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).query(&query).send().await;

        let result = match response {
            Ok(response) => match response.error_for_status() {
                Ok(response) => response.json::<Value>().await.map_err(LoopError::from),
                Err(e) => Err(LoopError::from(e)),
            },
            Err(e) => Err(LoopError::from(e)),
        };

        match &result {
            Ok(payload) => info!(city, payload = %payload, "weather lookup succeeded"),
            Err(e) => error!(city, "weather lookup failed: {e}"),
        }
        result
    }

    /// The payload rendered the way tool results carry it: indented JSON text.
    pub async fn current_text(&self, city: &str) -> Result<String> {
        let payload = self.current(city).await?;
        serde_json::to_string_pretty(&payload)
            .map_err(|e| LoopError::UpstreamRequest(anyhow::anyhow!(e)))
    }
}

/// In-process `get_weather`, for running without any MCP server.
pub struct WeatherTool {
    client: WeatherClient,
    spec: ToolSpec,
}

impl WeatherTool {
    pub fn new(client: WeatherClient) -> Self {
        Self {
            client,
            spec: weather_tool_spec(),
        }
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn description(&self) -> &str {
        &self.spec.description
    }

    fn input_schema(&self) -> Value {
        self.spec.input_schema.clone()
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolOutput> {
        let city = extract_string_arg(&args, "city")?;
        let text = self.client.current_text(&city).await?;
        Ok(ToolOutput::success(text))
    }
}
