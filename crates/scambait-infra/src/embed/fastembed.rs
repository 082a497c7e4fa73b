//! FastEmbed-based local embedding provider.
//!
//! Implements the `Embedder` trait from `scambait-core` using fastembed's
//! BGESmallENV15 model (384 dimensions) with ONNX runtime inference. The
//! model downloads on first use and is cached on disk, so no network call
//! happens on the hot path.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex;

use scambait_core::memory::Embedder;
use scambait_types::error::EmbeddingError;

const MODEL_NAME: &str = "BAAI/bge-small-en-v1.5";
const DIMENSION: usize = 384;

/// Local embedding generator.
///
/// The underlying session requires exclusive access for inference, so it
/// sits behind an async mutex. Inference is CPU-bound and fast for the
/// short texts this system embeds.
pub struct FastEmbedder {
    model: Mutex<TextEmbedding>,
}

impl FastEmbedder {
    pub fn new() -> Result<Self, EmbeddingError> {
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::BGESmallENV15))
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self.model.lock().await;
        let vectors = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Model(e.to_string()))?;

        for vector in &vectors {
            if vector.len() != DIMENSION {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: DIMENSION,
                    actual: vector.len(),
                });
            }
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}
