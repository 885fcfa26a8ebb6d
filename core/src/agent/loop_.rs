use crate::agent::{ContextBuilder, Conversation, ToolExecutor, ToolRegistry};
use crate::error::{LoopError, Result};
use crate::traits::{
    ChatMessage, ChatRequest, ChatResponse, Checkpointer, Provider, Role, ToolCall, ToolResult,
    ToolSpec,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Messages a thread keeps between turns: the last five exchanges.
pub const DEFAULT_MEMORY_WINDOW: usize = 10;

/// How many of the tool calls returned in one model turn get executed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallPolicy {
    /// Only the first call is executed; the rest are dropped from the turn.
    #[default]
    FirstOnly,
    /// Every call is executed, one after another, before the final turn.
    All,
}

impl ToolCallPolicy {
    fn select(self, mut calls: Vec<ToolCall>) -> Vec<ToolCall> {
        match self {
            Self::FirstOnly => {
                if calls.len() > 1 {
                    debug!(dropped = calls.len() - 1, "handling only the first tool call");
                }
                calls.truncate(1);
                calls
            }
            Self::All => calls,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub answer: String,
    pub conversation: Vec<ChatMessage>,
    pub tool_results: Vec<ToolResult>,
}

impl Completion {
    pub fn used_tools(&self) -> bool {
        !self.tool_results.is_empty()
    }
}

pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    context_builder: ContextBuilder,
    executor: ToolExecutor,
    call_policy: ToolCallPolicy,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    memory_window: usize,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        context_builder: ContextBuilder,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            context_builder,
            executor: ToolExecutor::new(tool_registry),
            call_policy: ToolCallPolicy::default(),
            checkpointer: None,
            memory_window: DEFAULT_MEMORY_WINDOW,
        }
    }

    pub fn with_call_policy(mut self, policy: ToolCallPolicy) -> Self {
        self.call_policy = policy;
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    pub fn with_memory_window(mut self, messages: usize) -> Self {
        self.memory_window = messages;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.executor.registry()
    }

    pub async fn process(&self, message: &str) -> Result<Completion> {
        self.process_with_history(message, vec![]).await
    }

    /// Like [`AgentLoop::process`], replaying and extending the thread's stored history.
    pub async fn process_in_thread(&self, message: &str, thread_id: &str) -> Result<Completion> {
        let Some(checkpointer) = &self.checkpointer else {
            return self.process(message).await;
        };

        let mut history = match checkpointer.load(thread_id).await {
            Ok(checkpoint) => checkpoint
                .map(|c| plain_history(&c.messages))
                .unwrap_or_default(),
            Err(e) => {
                warn!(thread = thread_id, "failed to load thread history: {e:#}");
                vec![]
            }
        };

        let completion = self.process_with_history(message, history.clone()).await?;

        history.push(ChatMessage::user(message));
        history.push(ChatMessage::assistant(completion.answer.clone()));
        keep_last(&mut history, self.memory_window);
        if let Err(e) = checkpointer.save(thread_id, history).await {
            warn!(thread = thread_id, "failed to save thread history: {e:#}");
        }

        Ok(completion)
    }

    pub async fn process_with_history(
        &self,
        message: &str,
        history: Vec<ChatMessage>,
    ) -> Result<Completion> {
        let mut conversation =
            Conversation::new(self.context_builder.build_messages(history, message));

        let tools = self.registry().describe_all();
        let response = self
            .dispatch(&conversation, if tools.is_empty() { None } else { Some(tools.as_slice()) })
            .await?;

        if !response.has_tool_calls() {
            let answer = response
                .text
                .unwrap_or_else(|| "No response from provider".to_string());
            conversation.push(ChatMessage::assistant(answer.clone()))?;
            return Ok(Completion {
                answer,
                conversation: conversation.into_messages(),
                tool_results: vec![],
            });
        }

        let calls = self.call_policy.select(response.tool_calls);
        conversation.push(ChatMessage::assistant_with_tool_calls(
            response.text.unwrap_or_default(),
            calls.clone(),
        ))?;

        let mut tool_results = Vec::with_capacity(calls.len());
        for call in &calls {
            let result = self.executor.execute(call).await?;
            conversation.push_tool_result(&result)?;
            tool_results.push(result);
        }

        let answer = self.compose(&mut conversation).await?;
        Ok(Completion {
            answer,
            conversation: conversation.into_messages(),
            tool_results,
        })
    }

    async fn dispatch(
        &self,
        conversation: &Conversation,
        tools: Option<&[ToolSpec]>,
    ) -> Result<ChatResponse> {
        debug!(
            provider = self.provider.name(),
            messages = conversation.len(),
            tools = tools.map_or(0, <[_]>::len),
            "dispatching to model"
        );
        let request = ChatRequest {
            messages: conversation.messages(),
            tools,
        };
        let response = self
            .provider
            .chat(request)
            .await
            .map_err(LoopError::UpstreamRequest)?;

        if let Some(call) = response.tool_calls.first() {
            info!(tool = %call.name, requested = response.tool_calls.len(), "model requested tool");
        }
        Ok(response)
    }

    /// Final-answer turn: the tool results are already in the conversation and no
    /// descriptors are offered.
    async fn compose(&self, conversation: &mut Conversation) -> Result<String> {
        let response = self.dispatch(conversation, None).await?;
        if response.has_tool_calls() {
            warn!("model requested tools on the final turn; ignoring");
        }
        let answer = response.text_or_empty().to_string();
        conversation.push(ChatMessage::assistant(answer.clone()))?;
        Ok(answer)
    }
}

/// Prior user/assistant exchanges only; tool traffic is not replayed.
pub fn plain_history(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant) && m.tool_calls.is_none())
        .cloned()
        .collect()
}

/// Drops the oldest messages until at most `window` remain.
fn keep_last(history: &mut Vec<ChatMessage>, window: usize) {
    let excess = history.len().saturating_sub(window);
    if excess > 0 {
        debug!(dropped = excess, "trimming thread history");
        history.drain(..excess);
    }
}
