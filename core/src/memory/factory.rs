use crate::memory::InMemoryCheckpointer;
use crate::traits::Checkpointer;
use std::sync::Arc;

pub fn create_checkpointer() -> Arc<dyn Checkpointer> {
    Arc::new(InMemoryCheckpointer::new())
}
