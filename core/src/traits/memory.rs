use crate::traits::ChatMessage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub messages: Vec<ChatMessage>,
    pub updated_at: String,
}

/// Short-term conversation memory keyed by thread id.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self, thread_id: &str) -> anyhow::Result<Option<Checkpoint>>;

    async fn save(&self, thread_id: &str, messages: Vec<ChatMessage>) -> anyhow::Result<()>;

    async fn clear(&self, thread_id: &str) -> anyhow::Result<bool>;

    async fn threads(&self) -> anyhow::Result<Vec<String>>;
}
