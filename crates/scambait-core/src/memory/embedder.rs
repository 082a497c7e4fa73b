//! Embedder trait for text-to-vector conversion.
//!
//! Defines the interface for embedding message and event text into vectors
//! for similarity search. Implementations (the fastembed local model, test
//! stubs) live in scambait-infra.

use scambait_types::error::EmbeddingError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition). One batch
/// call embeds any number of texts; single-text callers pass a slice of
/// one. Repeated calls on the same text must stay semantically comparable,
/// but exact numeric reproducibility is not required.
pub trait Embedder: Send + Sync {
    /// Embed one or more texts into vectors, one vector per input text.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;

    /// The model name used for embeddings (e.g., "BAAI/bge-small-en-v1.5").
    fn model_name(&self) -> &str;
}
