//! Embedding generation for normalized templates.

use std::sync::Arc;

use thiserror::Error;

use crate::llm_client::{EmbeddingService, LlmError};

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding service error: {0}")]
    Service(#[from] LlmError),

    #[error("embedding service returned no vectors")]
    NoVectors,

    #[error("cannot embed empty text")]
    EmptyInput,
}

#[derive(Clone)]
pub struct EmbeddingGenerator {
    embeddings: Arc<dyn EmbeddingService>,
}

impl EmbeddingGenerator {
    pub fn new(embeddings: Arc<dyn EmbeddingService>) -> Self {
        Self { embeddings }
    }

    /// Embeds `text` as a single-item batch and returns the vector unmodified.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let vectors = self.embeddings.embed(&[text]).await?;
        vectors.into_iter().next().ok_or(EmbeddingError::NoVectors)
    }
}
