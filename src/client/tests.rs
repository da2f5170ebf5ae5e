//! Shared fixtures for client tests, plus tests of the client itself

use super::*;
use crate::error::GitError;
use crate::store::MemoryEngine;
use crate::types::Commit;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Commit with deterministic identity fields
pub(crate) fn commit(hash: &str, subject: &str) -> Commit {
    Commit {
        hash: hash.to_string(),
        short_hash: hash.chars().take(7).collect(),
        author: "Jane".to_string(),
        date: "2024-01-01".to_string(),
        subject: subject.to_string(),
        ingest_content: format!("Body of {}", subject),
    }
}

/// In-memory history, newest first, that records every call
pub(crate) struct StubHistory {
    commits: Mutex<Vec<Commit>>,
    pub(crate) calls: Mutex<Vec<(usize, Option<String>)>>,
}

impl StubHistory {
    pub(crate) fn new(commits: Vec<Commit>) -> Arc<Self> {
        Arc::new(Self {
            commits: Mutex::new(commits),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Add a commit on top of the history
    pub(crate) fn push_newest(&self, commit: Commit) {
        self.commits.lock().unwrap().insert(0, commit);
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn last_since(&self) -> Option<String> {
        self.calls.lock().unwrap().last().and_then(|(_, since)| since.clone())
    }
}

impl HistoryReader for StubHistory {
    fn parse_log(
        &self,
        _repo_path: &Path,
        max_count: usize,
        since: Option<&str>,
    ) -> std::result::Result<Vec<Commit>, GitError> {
        self.calls
            .lock()
            .unwrap()
            .push((max_count, since.map(str::to_string)));

        let commits = self.commits.lock().unwrap();
        if let Some(since) = since
            && !commits.iter().any(|c| c.hash == since)
        {
            return Err(GitError::UnknownWatermark(since.to_string()));
        }

        let newer = commits
            .iter()
            .take_while(|c| Some(c.hash.as_str()) != since)
            .cloned();
        Ok(if max_count == 0 {
            newer.collect()
        } else {
            newer.take(max_count).collect()
        })
    }

    fn resolve_root(&self, path: &Path) -> std::result::Result<PathBuf, GitError> {
        Ok(path.to_path_buf())
    }
}

/// Three-dimensional embedder keyed on a few words, counting its calls
pub(crate) struct KeywordEmbedder {
    pub(crate) calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

impl EmbeddingProvider for KeywordEmbedder {
    fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = text.to_lowercase();
        let has = |word: &str| if text.contains(word) { 1.0 } else { 0.0 };
        Ok(vec![has("login"), has("parser"), 0.1])
    }

    fn dimension(&self) -> usize {
        3
    }

    fn identity(&self) -> String {
        "keyword/3".to_string()
    }
}

pub(crate) fn failing_loader() -> EmbedderLoader {
    Arc::new(|| -> std::result::Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
        Err(EmbeddingError::InitializationFailed("no model in tests".to_string()))
    })
}

pub(crate) fn loader_for(embedder: Arc<KeywordEmbedder>) -> EmbedderLoader {
    Arc::new(
        move || -> std::result::Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
            Ok(embedder.clone())
        },
    )
}

/// Client on a memory engine whose embedder never loads
pub(crate) fn text_only_client(history: Arc<StubHistory>) -> SiftClient<MemoryEngine> {
    SiftClient::with_parts(Config::default(), MemoryEngine::new(), history, failing_loader())
}

/// Client on a memory engine with the keyword embedder
pub(crate) fn embedding_client(
    history: Arc<StubHistory>,
    embedder: Arc<KeywordEmbedder>,
) -> SiftClient<MemoryEngine> {
    SiftClient::with_parts(
        Config::default(),
        MemoryEngine::new(),
        history,
        loader_for(embedder),
    )
}

#[tokio::test]
async fn test_failed_model_load_falls_back_to_text_only() {
    let client = text_only_client(StubHistory::new(Vec::new()));
    let capability = client.vector_capability(false).await;
    assert!(!capability.is_enabled());
}

#[tokio::test]
async fn test_model_is_loaded_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let embedder = KeywordEmbedder::new();
    let loader: EmbedderLoader = Arc::new(
        move || -> std::result::Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(embedder.clone())
        },
    );
    let client = SiftClient::with_parts(
        Config::default(),
        MemoryEngine::new(),
        StubHistory::new(Vec::new()),
        loader,
    );

    assert!(client.vector_capability(false).await.is_enabled());
    assert!(client.vector_capability(false).await.is_enabled());
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_text_only_skips_model_load() {
    let embedder = KeywordEmbedder::new();
    let client = embedding_client(StubHistory::new(Vec::new()), embedder);
    assert!(!client.vector_capability(true).await.is_enabled());

    let mut config = Config::default();
    config.embedding.text_only = true;
    let client = SiftClient::with_parts(
        config,
        MemoryEngine::new(),
        StubHistory::new(Vec::new()),
        loader_for(KeywordEmbedder::new()),
    );
    assert!(!client.vector_capability(false).await.is_enabled());
}

#[test]
fn test_resolve_repo_root_uses_history_reader() {
    let dir = TempDir::new().unwrap();
    let client = text_only_client(StubHistory::new(Vec::new()));
    assert_eq!(client.resolve_repo_root(dir.path()).unwrap(), dir.path());
}

#[test]
fn test_config_accessor() {
    let client = text_only_client(StubHistory::new(Vec::new()));
    assert_eq!(client.config().search.top_k, 10);
}
