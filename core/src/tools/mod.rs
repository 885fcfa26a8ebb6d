use crate::error::{LoopError, Result};
use serde_json::Value;

pub mod weather;

pub use weather::{WEATHER_TOOL_NAME, WeatherClient, WeatherTool, weather_tool_spec};

/// A required, non-blank string argument.
pub fn extract_string_arg(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| LoopError::MissingArgument(key.to_string()))
}
