use thiserror::Error;

/// Errors from repository operations (used by trait definitions in scambait-core).
///
/// These never cross the `MemoryBackend` facade boundary: the facade logs
/// them and degrades to neutral defaults so a storage failure can never
/// fail a user-facing turn.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("lock acquisition failed: {0}")]
    Lock(String),
}

/// Errors from the embedding provider.
///
/// An embedding failure downgrades the affected row to a null embedding;
/// it never blocks a write.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model error: {0}")]
    Model(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}
