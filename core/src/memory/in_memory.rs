use crate::traits::{ChatMessage, Checkpoint, Checkpointer};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Process-local thread store. Everything is lost when the process exits.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    threads: RwLock<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, thread_id: &str) -> anyhow::Result<Option<Checkpoint>> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &str, messages: Vec<ChatMessage>) -> anyhow::Result<()> {
        let checkpoint = Checkpoint {
            thread_id: thread_id.to_string(),
            messages,
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        self.threads
            .write()
            .await
            .insert(thread_id.to_string(), checkpoint);
        Ok(())
    }

    async fn clear(&self, thread_id: &str) -> anyhow::Result<bool> {
        Ok(self.threads.write().await.remove(thread_id).is_some())
    }

    async fn threads(&self) -> anyhow::Result<Vec<String>> {
        let mut ids: Vec<String> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
