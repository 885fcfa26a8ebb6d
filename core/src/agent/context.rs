use crate::traits::{ChatMessage, Role};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer the user's questions, calling a tool when it is needed.";

pub struct ContextBuilder {
    pub system_prompt: String,
    pub include_time: bool,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            include_time: false,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_time(mut self, include_time: bool) -> Self {
        self.include_time = include_time;
        self
    }

    pub fn build_system_prompt(&self) -> String {
        if !self.include_time {
            return self.system_prompt.clone();
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M (%A)");
        format!("{}\n\nCurrent time: {}", self.system_prompt, timestamp)
    }

    /// System prompt, then prior history (any system messages in it dropped), then the query.
    pub fn build_messages(&self, history: Vec<ChatMessage>, current_message: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        let system = self.build_system_prompt();
        if !system.trim().is_empty() {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(history.into_iter().filter(|m| m.role != Role::System));
        messages.push(ChatMessage::user(current_message));
        messages
    }
}
