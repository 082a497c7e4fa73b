//! Database-less memory backend.

mod in_memory;

pub use in_memory::InMemoryMemory;
