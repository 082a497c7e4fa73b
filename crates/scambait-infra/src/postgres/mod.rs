//! Postgres/pgvector storage layer.
//!
//! Session store, advisory-lock concurrency guard, and learning-index
//! queries backed by a pooled `sqlx` Postgres connection with the pgvector
//! extension for cosine-distance search.

pub mod learning;
pub mod lock;
pub mod memory;
pub mod pool;
pub mod schema;
pub mod session;

pub use learning::LearningIndex;
pub use memory::PostgresMemory;
pub use pool::create_pool;
pub use schema::ensure_schema;
pub use session::PgSessionStore;
