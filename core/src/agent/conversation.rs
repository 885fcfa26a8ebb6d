use crate::error::{LoopError, Result};
use crate::traits::{ChatMessage, Role, ToolResult};

/// Ordered message list that refuses tool messages the backend would reject.
///
/// A `tool` message must sit in the run of tool messages directly after the
/// assistant turn that requested it, and must answer one of that turn's call ids
/// exactly once.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: ChatMessage) -> Result<()> {
        if message.role == Role::Tool {
            self.check_tool_message(&message)?;
        }
        self.messages.push(message);
        Ok(())
    }

    pub fn push_tool_result(&mut self, result: &ToolResult) -> Result<()> {
        self.push(ChatMessage::tool_result(
            result.call_id.clone(),
            result.output.text(),
        ))
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn check_tool_message(&self, message: &ChatMessage) -> Result<()> {
        let call_id = message.tool_call_id.as_deref().ok_or_else(|| {
            LoopError::Conversation("tool message without a call id".to_string())
        })?;

        let answered: Vec<&str> = self
            .messages
            .iter()
            .rev()
            .take_while(|m| m.role == Role::Tool)
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();

        let requester = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role != Role::Tool)
            .filter(|m| m.role == Role::Assistant)
            .ok_or_else(|| {
                LoopError::Conversation(format!(
                    "tool result '{call_id}' does not follow an assistant tool-call turn"
                ))
            })?;

        if !requester.requested_calls().iter().any(|c| c.id == call_id) {
            return Err(LoopError::Conversation(format!(
                "tool result '{call_id}' answers no call of the preceding assistant turn"
            )));
        }
        if answered.contains(&call_id) {
            return Err(LoopError::Conversation(format!(
                "tool call '{call_id}' already has a result"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ToolCall, ToolOutput};

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "get_weather".into(),
            arguments: r#"{"city":"Beijing"}"#.into(),
        }
    }

    #[test]
    fn tool_result_must_follow_requesting_turn() {
        let mut conversation = Conversation::new(vec![ChatMessage::user("weather?")]);
        let err = conversation
            .push(ChatMessage::tool_result("call_1", "{}"))
            .unwrap_err();
        assert!(matches!(err, LoopError::Conversation(_)));

        conversation
            .push(ChatMessage::assistant_with_tool_calls("", vec![call("call_1")]))
            .unwrap();
        conversation
            .push_tool_result(&ToolResult::new("call_1", ToolOutput::success("sunny")))
            .unwrap();
        assert_eq!(conversation.len(), 3);
    }

    #[test]
    fn rejects_foreign_and_repeated_ids() {
        let mut conversation = Conversation::new(vec![
            ChatMessage::user("weather?"),
            ChatMessage::assistant_with_tool_calls("", vec![call("a"), call("b")]),
        ]);
        assert!(conversation.push(ChatMessage::tool_result("zzz", "")).is_err());
        conversation.push(ChatMessage::tool_result("a", "1")).unwrap();
        assert!(conversation.push(ChatMessage::tool_result("a", "again")).is_err());
        conversation.push(ChatMessage::tool_result("b", "2")).unwrap();
    }

    #[test]
    fn tool_message_needs_call_id() {
        let mut conversation = Conversation::new(vec![ChatMessage::assistant_with_tool_calls(
            "",
            vec![call("a")],
        )]);
        let mut message = ChatMessage::tool_result("a", "x");
        message.tool_call_id = None;
        assert!(conversation.push(message).is_err());
    }
}
