pub mod agent;
pub mod config;
pub mod error;
pub mod mcp;
pub mod memory;
pub mod providers;
pub mod tools;
pub mod traits;

pub use agent::{AgentLoop, Completion, ContextBuilder, ToolCallPolicy, ToolRegistry};
pub use config::{Config, WeatherConfig};
pub use error::{LoopError, Result};
pub use memory::{InMemoryCheckpointer, create_checkpointer};
pub use providers::{OllamaProvider, OpenAIProvider, create_provider};
pub use tools::{WEATHER_TOOL_NAME, WeatherClient, WeatherTool};
pub use traits::{
    ChatMessage, ChatRequest, ChatResponse, Checkpoint, Checkpointer, Provider, Role, Tool,
    ToolCall, ToolOutput, ToolResult, ToolSpec,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_names_resolve_to_one_item_each() {
        let config = Config {
            provider: Some("ollama".into()),
            ..Config::default()
        };
        assert_eq!(create_provider(&config).unwrap().name(), "ollama");
        assert_eq!(create_checkpointer().name(), "in_memory");
    }
}
