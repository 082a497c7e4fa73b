//! Memory backend and embedding provider seams.
//!
//! The orchestration layer depends only on these traits; the concrete
//! Postgres and in-memory implementations live in scambait-infra, so the
//! backend choice is a configuration decision rather than a code branch.

pub mod backend;
pub mod embedder;

pub use backend::MemoryBackend;
pub use embedder::Embedder;
