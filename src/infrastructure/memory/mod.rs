//! In-Memory Implementations

mod session_registry;

pub use session_registry::InMemorySessionRegistry;
