//! Core library client for sift
//!
//! [`SiftClient`] ties the pieces together: a history reader, a store
//! engine and an optional embedding model. It exposes the three operations
//! the CLI is built on: indexing a repository, searching it, and reading
//! index statistics.

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, FastEmbedManager, VectorCapability};
use crate::error::{EmbeddingError, Result};
use crate::git::{GitLogReader, HistoryReader};
use crate::store::{StoreEngine, TantivyEngine};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

pub mod fs_lock;
pub mod indexing;
pub mod search;
pub mod session;
pub mod stats;

pub use fs_lock::StoreLock;
pub use indexing::ProgressFn;
pub use session::RepoSession;

/// Deferred constructor for the embedding model
pub type EmbedderLoader =
    Arc<dyn Fn() -> std::result::Result<Arc<dyn EmbeddingProvider>, EmbeddingError> + Send + Sync>;

/// Main client for indexing and searching commit history
///
/// The embedding model is loaded lazily on the first session that wants
/// vectors and cached for the client's lifetime. If it cannot be loaded the
/// client logs a warning and works text-only.
///
/// # Example
///
/// ```no_run
/// use sift::SiftClient;
/// use std::path::Path;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = SiftClient::new()?;
///     let root = client.resolve_repo_root(Path::new("."))?;
///
///     client.ensure_indexed(&root, false, 0, true).await?;
///     for hit in client.search(&root, "fix login redirect", 5, false).await? {
///         println!("{} {}", hit.short_hash, hit.subject);
///     }
///     Ok(())
/// }
/// ```
pub struct SiftClient<E: StoreEngine = TantivyEngine> {
    pub(crate) config: Arc<Config>,
    pub(crate) engine: Arc<E>,
    pub(crate) history: Arc<dyn HistoryReader>,
    embedder_loader: EmbedderLoader,
    embedder: OnceLock<Option<Arc<dyn EmbeddingProvider>>>,
}

impl SiftClient<TantivyEngine> {
    /// Create a client from the user's configuration file and environment
    pub fn new() -> Result<Self> {
        let config = Config::new()?;
        Ok(Self::with_config(config))
    }

    /// Create a client with the shipped git reader, store and embedder
    pub fn with_config(config: Config) -> Self {
        tracing::debug!("Embedding model: {}", config.embedding.model_name);

        let history = Arc::new(GitLogReader::new(
            config.history.include_diffs,
            config.history.max_diff_bytes,
            config.history.max_content_bytes,
        ));

        let model_name = config.embedding.model_name.clone();
        let loader: EmbedderLoader = Arc::new(
            move || -> std::result::Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
                let manager = FastEmbedManager::from_model_name(&model_name)?;
                Ok(Arc::new(manager))
            },
        );

        Self::with_parts(config, TantivyEngine::new(), history, loader)
    }
}

impl<E: StoreEngine> SiftClient<E> {
    /// Create a client from explicit collaborators
    pub fn with_parts(
        config: Config,
        engine: E,
        history: Arc<dyn HistoryReader>,
        embedder_loader: EmbedderLoader,
    ) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            history,
            embedder_loader,
            embedder: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Resolve any path inside a repository to its working tree root
    pub fn resolve_repo_root(&self, path: &Path) -> Result<PathBuf> {
        Ok(self.history.resolve_root(path)?)
    }

    /// Pick the vector capability for a new session
    pub(crate) async fn vector_capability(&self, text_only: bool) -> VectorCapability {
        if text_only || self.config.embedding.text_only {
            return VectorCapability::TextOnly;
        }

        if let Some(cached) = self.embedder.get() {
            return Self::capability_from(cached);
        }

        let loader = Arc::clone(&self.embedder_loader);
        let loaded = match tokio::task::spawn_blocking(move || loader()).await {
            Ok(Ok(provider)) => {
                tracing::info!("Loaded embedding model {}", provider.identity());
                Some(provider)
            }
            Ok(Err(e)) => {
                tracing::warn!("Embedding model unavailable, using text-only search: {}", e);
                None
            }
            Err(e) => {
                tracing::warn!("Embedding model loader failed, using text-only search: {}", e);
                None
            }
        };

        Self::capability_from(self.embedder.get_or_init(|| loaded))
    }

    fn capability_from(cached: &Option<Arc<dyn EmbeddingProvider>>) -> VectorCapability {
        match cached {
            Some(provider) => VectorCapability::Embedded(Arc::clone(provider)),
            None => VectorCapability::TextOnly,
        }
    }
}

#[cfg(test)]
mod tests;
