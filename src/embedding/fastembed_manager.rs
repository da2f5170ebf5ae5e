use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// Name of the model used when none is configured
pub const DEFAULT_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// A supported fastembed model under its canonical name
#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub model: EmbeddingModel,
    pub name: &'static str,
    pub dimension: usize,
}

/// Resolve a configured model name or alias to its canonical spec
pub fn resolve_model(name: &str) -> Result<ModelSpec, EmbeddingError> {
    let (model, name, dimension) = match name {
        "all-MiniLM-L6-v2" | "sentence-transformers/all-MiniLM-L6-v2" => (
            EmbeddingModel::AllMiniLML6V2,
            "sentence-transformers/all-MiniLM-L6-v2",
            384,
        ),
        "all-MiniLM-L12-v2" | "sentence-transformers/all-MiniLM-L12-v2" => (
            EmbeddingModel::AllMiniLML12V2,
            "sentence-transformers/all-MiniLM-L12-v2",
            384,
        ),
        "bge-base-en-v1.5" | "BAAI/bge-base-en-v1.5" => {
            (EmbeddingModel::BGEBaseENV15, "BAAI/bge-base-en-v1.5", 768)
        }
        "bge-small-en-v1.5" | "BAAI/bge-small-en-v1.5" => {
            (EmbeddingModel::BGESmallENV15, "BAAI/bge-small-en-v1.5", 384)
        }
        other => return Err(EmbeddingError::UnknownModel(other.to_string())),
    };

    Ok(ModelSpec {
        model,
        name,
        dimension,
    })
}

/// Identity tag for vectors from a model; aliases of one model share it
fn identity_for(spec: &ModelSpec) -> String {
    format!("fastembed/{}/{}", spec.name, spec.dimension)
}

/// FastEmbed-based embedding provider using all-MiniLM-L6-v2 by default
pub struct FastEmbedManager {
    // `TextEmbedding::embed` takes `&mut self`
    model: Mutex<TextEmbedding>,
    spec: ModelSpec,
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::from_model_name(DEFAULT_MODEL_NAME)
    }

    /// Create a manager from a configured model name
    pub fn from_model_name(name: &str) -> Result<Self, EmbeddingError> {
        Self::with_spec(resolve_model(name)?)
    }

    /// Create a new FastEmbedManager for a resolved model
    pub fn with_spec(spec: ModelSpec) -> Result<Self, EmbeddingError> {
        tracing::info!("Initializing FastEmbed model: {}", spec.name);

        let mut options = InitOptions::default();
        options.model_name = spec.model.clone();
        options.show_download_progress = false;

        let embedding_model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitializationFailed(format!("{:#}", e)))?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            spec,
        })
    }

    pub fn model_name(&self) -> &str {
        self.spec.name
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;

        let mut embeddings = model
            .embed(vec![text], None)
            .map_err(|e| EmbeddingError::GenerationFailed(format!("{:#}", e)))?;

        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::GenerationFailed("model returned no vector".to_string()))
    }

    fn dimension(&self) -> usize {
        self.spec.dimension
    }

    fn identity(&self) -> String {
        identity_for(&self.spec)
    }
}
