pub mod factory;
pub mod in_memory;

pub use factory::create_checkpointer;
pub use in_memory::InMemoryCheckpointer;
