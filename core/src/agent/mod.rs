pub mod chat;
pub mod context;
pub mod conversation;
pub mod executor;
pub mod loop_;
pub mod registry;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{LineSource, run_chat_loop};
pub use context::ContextBuilder;
pub use conversation::Conversation;
pub use executor::ToolExecutor;
pub use loop_::{AgentLoop, Completion, DEFAULT_MEMORY_WINDOW, ToolCallPolicy};
pub use registry::{FnTool, ToolRegistry};
pub use validate::validate_arguments;
