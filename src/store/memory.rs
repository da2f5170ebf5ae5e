//! In-process store engine
//!
//! Keeps committed frames in memory, keyed by store path, so that several
//! sessions created from clones of one engine see the same data. Creating a
//! store also writes an empty marker file at the path so existence checks on
//! the filesystem behave as they do for on-disk engines.

use super::{
    FrameId, FrameMetadata, SearchMode, SearchRequest, SessionConfig, StoreEngine, StoreSearchResult,
    StoreSession, StoreStats, blend_scores, cosine_similarity, sort_ranked, truncate_utf8,
};
use crate::error::StoreError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct MemoryFrame {
    id: FrameId,
    content: Vec<u8>,
    embedding: Option<Vec<f32>>,
    identity: Option<String>,
    metadata: FrameMetadata,
    text: String,
}

#[derive(Debug, Default)]
struct MemoryStore {
    frames: Vec<MemoryFrame>,
}

type SharedStores = Arc<Mutex<HashMap<PathBuf, MemoryStore>>>;

/// Store engine that never touches disk beyond a marker file
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    stores: SharedStores,
    fail_commits: Arc<AtomicBool>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail until reset
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of committed frames at `path`, if a store exists there
    pub fn committed_frames(&self, path: &Path) -> Option<usize> {
        let stores = self.stores.lock().ok()?;
        stores.get(path).map(|store| store.frames.len())
    }

    /// Metadata of each committed frame at `path`, in frame order
    pub fn committed_metadata(&self, path: &Path) -> Option<Vec<FrameMetadata>> {
        let stores = self.stores.lock().ok()?;
        stores
            .get(path)
            .map(|store| store.frames.iter().map(|frame| frame.metadata.clone()).collect())
    }

    fn lock_stores(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<PathBuf, MemoryStore>>, StoreError> {
        self.stores
            .lock()
            .map_err(|e| StoreError::LockFailed(e.to_string()))
    }
}

/// Session on an in-process store
pub struct MemorySession {
    stores: SharedStores,
    fail_commits: Arc<AtomicBool>,
    path: PathBuf,
    config: SessionConfig,
    pending: Vec<MemoryFrame>,
    next_id: FrameId,
}

#[async_trait::async_trait]
impl StoreEngine for MemoryEngine {
    type Session = MemorySession;

    async fn create(
        &self,
        path: &Path,
        config: &SessionConfig,
    ) -> Result<Self::Session, StoreError> {
        let create_failed = |reason: String| StoreError::CreateFailed {
            path: path.display().to_string(),
            reason,
        };

        if path.exists() {
            return Err(create_failed("path already exists".to_string()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| create_failed(e.to_string()))?;
        }
        std::fs::write(path, b"").map_err(|e| create_failed(e.to_string()))?;

        self.lock_stores()?
            .insert(path.to_path_buf(), MemoryStore::default());

        Ok(MemorySession {
            stores: Arc::clone(&self.stores),
            fail_commits: Arc::clone(&self.fail_commits),
            path: path.to_path_buf(),
            config: config.clone(),
            pending: Vec::new(),
            next_id: 0,
        })
    }

    async fn open(&self, path: &Path, config: &SessionConfig) -> Result<Self::Session, StoreError> {
        let next_id = {
            let stores = self.lock_stores()?;
            let store = stores.get(path).ok_or_else(|| StoreError::OpenFailed {
                path: path.display().to_string(),
                reason: "no store at this path".to_string(),
            })?;
            store.frames.len() as FrameId
        };

        Ok(MemorySession {
            stores: Arc::clone(&self.stores),
            fail_commits: Arc::clone(&self.fail_commits),
            path: path.to_path_buf(),
            config: config.clone(),
            pending: Vec::new(),
            next_id,
        })
    }
}

impl MemorySession {
    fn with_committed<T>(
        &self,
        f: impl FnOnce(&[MemoryFrame]) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let stores = self
            .stores
            .lock()
            .map_err(|e| StoreError::LockFailed(e.to_string()))?;
        let store = stores.get(&self.path).ok_or_else(|| StoreError::OpenFailed {
            path: self.path.display().to_string(),
            reason: "store was removed".to_string(),
        })?;
        f(&store.frames)
    }
}

/// Occurrences of each lowercase query term in the frame text
fn term_frequency(text: &str, query: &str) -> f32 {
    let haystack = text.to_lowercase();
    query
        .split_whitespace()
        .map(|term| haystack.matches(&term.to_lowercase()).count() as f32)
        .sum()
}

#[async_trait::async_trait]
impl StoreSession for MemorySession {
    async fn put(
        &mut self,
        content: Vec<u8>,
        embedding: Option<Vec<f32>>,
        identity: Option<&str>,
        metadata: FrameMetadata,
    ) -> Result<FrameId, StoreError> {
        if let (Some(vector), Some(expected)) = (&embedding, self.config.vector_dimensions)
            && vector.len() != expected
        {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.pending.push(MemoryFrame {
            id,
            content,
            embedding,
            identity: identity.map(str::to_string),
            metadata,
            text: String::new(),
        });
        Ok(id)
    }

    async fn index_text(&mut self, frame_id: FrameId, text: &str) -> Result<(), StoreError> {
        let frame = self
            .pending
            .iter_mut()
            .find(|frame| frame.id == frame_id)
            .ok_or(StoreError::UnknownFrame(frame_id))?;
        if !frame.text.is_empty() {
            frame.text.push('\n');
        }
        frame.text.push_str(text);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::CommitFailed("commit failure injected".to_string()));
        }

        let mut stores = self
            .stores
            .lock()
            .map_err(|e| StoreError::LockFailed(e.to_string()))?;
        let store = stores
            .get_mut(&self.path)
            .ok_or_else(|| StoreError::CommitFailed("store was removed".to_string()))?;
        store.frames.append(&mut self.pending);
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<StoreSearchResult>, StoreError> {
        self.with_committed(|frames| {
            let text: Vec<(FrameId, f32)> = frames
                .iter()
                .map(|frame| (frame.id, term_frequency(&frame.text, &request.query)))
                .filter(|(_, score)| *score > 0.0)
                .collect();

            let ranked = match (request.mode, &request.embedding) {
                (SearchMode::Hybrid { alpha }, Some(query_vector)) => {
                    let vector: Vec<(FrameId, f32)> = frames
                        .iter()
                        .filter(|frame| match (&request.identity, &frame.identity) {
                            (Some(wanted), Some(stored)) => wanted == stored,
                            _ => true,
                        })
                        .filter_map(|frame| {
                            frame
                                .embedding
                                .as_ref()
                                .filter(|v| v.len() == query_vector.len())
                                .map(|v| (frame.id, cosine_similarity(query_vector, v)))
                        })
                        .collect();
                    blend_scores(&text, &vector, alpha, request.top_k)
                }
                _ => {
                    let mut text = text;
                    sort_ranked(&mut text);
                    text.truncate(request.top_k);
                    text
                }
            };

            Ok(ranked
                .into_iter()
                .map(|(frame_id, score)| {
                    let preview_text = frames
                        .iter()
                        .find(|frame| frame.id == frame_id)
                        .and_then(|frame| std::str::from_utf8(&frame.content).ok())
                        .map(|text| truncate_utf8(text, request.preview_max_bytes).to_string());
                    StoreSearchResult {
                        frame_id,
                        score,
                        preview_text,
                    }
                })
                .collect())
        })
    }

    async fn frame_content(&self, frame_id: FrameId) -> Result<Vec<u8>, StoreError> {
        self.with_committed(|frames| {
            frames
                .iter()
                .find(|frame| frame.id == frame_id)
                .map(|frame| frame.content.clone())
                .ok_or(StoreError::UnknownFrame(frame_id))
        })
    }

    async fn frame_preview(
        &self,
        frame_id: FrameId,
        max_bytes: usize,
    ) -> Result<Vec<u8>, StoreError> {
        let content = self.frame_content(frame_id).await?;
        Ok(super::preview_bytes(&content, max_bytes))
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        self.with_committed(|frames| {
            Ok(StoreStats {
                frame_count: frames.len() as u64,
            })
        })
    }

    async fn close(self) -> Result<(), StoreError> {
        if !self.pending.is_empty() {
            tracing::debug!(
                "Discarding {} uncommitted frames for {}",
                self.pending.len(),
                self.path.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(query: &str, top_k: usize) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            embedding: None,
            identity: None,
            mode: SearchMode::TextOnly,
            top_k,
            preview_max_bytes: 4,
        }
    }

    #[tokio::test]
    async fn test_sessions_share_committed_frames() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sift").join("store");
        let engine = MemoryEngine::new();

        let mut session = engine.create(&path, &SessionConfig::default()).await.unwrap();
        assert!(path.exists());
        let id = session
            .put(b"hello world".to_vec(), None, None, FrameMetadata::new())
            .await
            .unwrap();
        session.index_text(id, "hello world").await.unwrap();
        session.commit().await.unwrap();
        session.close().await.unwrap();

        let reopened = engine.open(&path, &SessionConfig::default()).await.unwrap();
        let results = reopened.search(&request("HELLO", 5)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].preview_text.as_deref(), Some("hell"));
        assert_eq!(engine.committed_frames(&path), Some(1));
    }

    #[tokio::test]
    async fn test_failed_commit_keeps_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        let engine = MemoryEngine::new();
        let mut session = engine.create(&path, &SessionConfig::default()).await.unwrap();
        session
            .put(b"x".to_vec(), None, None, FrameMetadata::new())
            .await
            .unwrap();

        engine.set_fail_commits(true);
        assert!(matches!(
            session.commit().await,
            Err(StoreError::CommitFailed(_))
        ));
        assert_eq!(session.stats().await.unwrap().frame_count, 0);
    }

    #[tokio::test]
    async fn test_open_missing_store_fails() {
        let engine = MemoryEngine::new();
        let result = engine
            .open(Path::new("/nowhere/store"), &SessionConfig::default())
            .await;
        assert!(matches!(result, Err(StoreError::OpenFailed { .. })));
    }

    #[test]
    fn test_term_frequency_counts_each_term() {
        assert_eq!(term_frequency("Fix login; login works", "login"), 2.0);
        assert_eq!(term_frequency("Fix login", "fix login"), 2.0);
        assert_eq!(term_frequency("Fix login", "parser"), 0.0);
    }
}
