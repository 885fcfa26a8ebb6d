pub mod memory;
pub mod provider;
pub mod tool;

pub use memory::{Checkpoint, Checkpointer};
pub use provider::{ChatMessage, ChatRequest, ChatResponse, Provider, Role, ToolCall};
pub use tool::{ContentBlock, Tool, ToolOutput, ToolResult, ToolSpec};
