/// Centralized error types for sift using thiserror
///
/// Every fatal condition in an indexing run or a query surfaces as a
/// [`SiftError`]. Decoding stored frames has no error path at all.
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library API
pub type Result<T, E = SiftError> = std::result::Result<T, E>;

/// Main error type for sift
#[derive(Error, Debug)]
pub enum SiftError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("No index found for {}. Run `sift index --repo-path {}` first.", .repo_root.display(), .repo_root.display())]
    NotIndexed { repo_root: PathBuf },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while resolving a repository or reading its history
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    RepoNotFound(String),

    #[error("Failed to open git repository: {0}")]
    OpenFailed(String),

    #[error("Repository has no working directory: {0}")]
    BareRepository(String),

    #[error("Failed to iterate commits: {0}")]
    IterFailed(String),

    #[error("Failed to parse commit {hash}: {reason}")]
    ParseFailed { hash: String, reason: String },

    #[error("Last indexed commit {0} is not in the history anymore; re-run with --full")]
    UnknownWatermark(String),

    #[error("History reader task failed: {0}")]
    TaskFailed(String),
}

/// Errors raised by a store engine or while holding a store session
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to create store at '{path}': {reason}")]
    CreateFailed { path: String, reason: String },

    #[error("Failed to open store at '{path}': {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Store at '{0}' is in use by another session")]
    Busy(String),

    #[error("Failed to acquire store lock: {0}")]
    LockFailed(String),

    #[error("Failed to store frame: {0}")]
    PutFailed(String),

    #[error("Unknown frame id: {0}")]
    UnknownFrame(u64),

    #[error("Failed to commit frames: {0}")]
    CommitFailed(String),

    #[error("Failed to search store: {0}")]
    SearchFailed(String),

    #[error("Failed to read frame {frame_id}: {reason}")]
    ReadFailed { frame_id: u64, reason: String },

    #[error("Embedding dimension mismatch: store expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<anyhow::Error> for SiftError {
    fn from(err: anyhow::Error) -> Self {
        SiftError::Other(format!("{:#}", err))
    }
}

impl SiftError {
    /// True when the user can fix this by changing how the command is invoked
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SiftError::NotIndexed { .. }
                | SiftError::Validation(_)
                | SiftError::Git(GitError::RepoNotFound(_))
                | SiftError::Git(GitError::UnknownWatermark(_))
                | SiftError::Store(StoreError::Busy(_))
                | SiftError::Config(ConfigError::InvalidValue { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_indexed_message_names_repo() {
        let err = SiftError::NotIndexed {
            repo_root: PathBuf::from("/work/repo"),
        };
        assert_eq!(
            err.to_string(),
            "No index found for /work/repo. Run `sift index --repo-path /work/repo` first."
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SiftError = io_err.into();
        assert!(matches!(err, SiftError::Io(_)));
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: SiftError = anyhow::anyhow!("boom").context("while indexing").into();
        assert_eq!(err.to_string(), "while indexing: boom");
    }

    #[test]
    fn test_error_chain() {
        let err: SiftError = StoreError::CommitFailed("disk full".to_string()).into();
        assert!(matches!(err, SiftError::Store(_)));
        assert_eq!(
            err.to_string(),
            "Store error: Failed to commit frames: disk full"
        );
    }

    #[test]
    fn test_is_user_error() {
        assert!(
            SiftError::NotIndexed {
                repo_root: PathBuf::from("/r")
            }
            .is_user_error()
        );
        assert!(SiftError::Store(StoreError::Busy("/r/.sift/store".into())).is_user_error());
        assert!(!SiftError::Store(StoreError::CommitFailed("x".into())).is_user_error());
        assert!(!SiftError::Embedding(EmbeddingError::GenerationFailed("x".into())).is_user_error());
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let err = StoreError::DimensionMismatch {
            expected: 384,
            actual: 768,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: store expects 384, got 768"
        );
    }
}
