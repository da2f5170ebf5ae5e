pub mod fastembed_manager;

pub use fastembed_manager::FastEmbedManager;

use crate::error::EmbeddingError;
use std::fmt;
use std::sync::Arc;

/// Trait for embedding generation
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Tag naming the model that produced a vector, e.g. `fastembed/BAAI/bge-small-en-v1.5/384`
    fn identity(&self) -> String;
}

/// Whether a session produces vectors, fixed when the session is opened
#[derive(Clone, Default)]
pub enum VectorCapability {
    /// No vectors; ingestion stores text only and queries rank by text
    #[default]
    TextOnly,
    /// Vectors from the wrapped provider
    Embedded(Arc<dyn EmbeddingProvider>),
}

impl VectorCapability {
    /// Embed `text`, or `None` when vectors are disabled
    ///
    /// Model inference is CPU-bound, so it runs on the blocking thread pool.
    pub async fn embed(&self, text: &str) -> Result<Option<Vec<f32>>, EmbeddingError> {
        let provider = match self {
            VectorCapability::TextOnly => return Ok(None),
            VectorCapability::Embedded(provider) => Arc::clone(provider),
        };

        let text = text.to_string();
        tokio::task::spawn_blocking(move || provider.embed(&text))
            .await
            .map_err(|e| EmbeddingError::GenerationFailed(format!("Embedding task failed: {}", e)))?
            .map(Some)
    }

    pub fn identity(&self) -> Option<String> {
        match self {
            VectorCapability::TextOnly => None,
            VectorCapability::Embedded(provider) => Some(provider.identity()),
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        match self {
            VectorCapability::TextOnly => None,
            VectorCapability::Embedded(provider) => Some(provider.dimension()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, VectorCapability::Embedded(_))
    }
}

impl fmt::Debug for VectorCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorCapability::TextOnly => write!(f, "TextOnly"),
            VectorCapability::Embedded(provider) => {
                write!(f, "Embedded({})", provider.identity())
            }
        }
    }
}
