//! Frame store abstraction
//!
//! A store persists frames (content bytes, an optional vector, metadata)
//! and answers ranked text or hybrid queries over them. Writes made through a
//! [`StoreSession`] become visible only after [`StoreSession::commit`].

pub mod memory;
pub mod tantivy_store;

pub use memory::MemoryEngine;
pub use tantivy_store::TantivyEngine;

use crate::error::StoreError;
use std::collections::BTreeMap;
use std::path::Path;

/// Opaque frame identifier assigned by the store on write
pub type FrameId = u64;

/// Key/value metadata stored alongside a frame
pub type FrameMetadata = BTreeMap<String, String>;

/// Blend weight of the vector channel in hybrid search
pub const HYBRID_ALPHA: f32 = 0.4;

/// Per-session options, fixed when the session is opened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Dimension of vectors written in this session, `None` for text-only
    pub vector_dimensions: Option<usize>,
}

/// Ranking mode of a search request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchMode {
    /// Text relevance only
    TextOnly,
    /// `(1 - alpha) * normalized_text + alpha * vector_similarity`
    Hybrid { alpha: f32 },
}

/// A ranked query against a store
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    /// Query vector, required for hybrid mode
    pub embedding: Option<Vec<f32>>,
    /// Identity of the model that produced `embedding`
    pub identity: Option<String>,
    pub mode: SearchMode,
    pub top_k: usize,
    /// Size cap of the inline preview returned with each result
    pub preview_max_bytes: usize,
}

/// One ranked result from a store
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSearchResult {
    pub frame_id: FrameId,
    pub score: f32,
    /// Inline preview, if the engine supplies one
    pub preview_text: Option<String>,
}

/// Store-level statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub frame_count: u64,
}

/// Opens sessions on a store location
///
/// `create` and `open` are mutually exclusive; callers choose based on
/// whether the store path already exists.
#[async_trait::async_trait]
pub trait StoreEngine: Send + Sync {
    type Session: StoreSession;

    /// Create a new store at `path` and open a session on it
    async fn create(
        &self,
        path: &Path,
        config: &SessionConfig,
    ) -> Result<Self::Session, StoreError>;

    /// Open a session on an existing store
    async fn open(&self, path: &Path, config: &SessionConfig) -> Result<Self::Session, StoreError>;
}

/// A read/write session on one store
#[async_trait::async_trait]
pub trait StoreSession: Send + Sync {
    /// Stage a frame; returns its id. Not visible until `commit`.
    async fn put(
        &mut self,
        content: Vec<u8>,
        embedding: Option<Vec<f32>>,
        identity: Option<&str>,
        metadata: FrameMetadata,
    ) -> Result<FrameId, StoreError>;

    /// Attach searchable text to a staged frame
    async fn index_text(&mut self, frame_id: FrameId, text: &str) -> Result<(), StoreError>;

    /// Make all staged frames visible atomically
    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Ranked search over committed frames, at most `request.top_k` results
    async fn search(&self, request: &SearchRequest) -> Result<Vec<StoreSearchResult>, StoreError>;

    /// Full stored content of a committed frame
    async fn frame_content(&self, frame_id: FrameId) -> Result<Vec<u8>, StoreError>;

    /// At most `max_bytes` of a committed frame's content
    async fn frame_preview(
        &self,
        frame_id: FrameId,
        max_bytes: usize,
    ) -> Result<Vec<u8>, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;

    /// End the session; staged frames that were never committed are dropped
    async fn close(self) -> Result<(), StoreError>;
}

/// Truncate to at most `max_bytes` without splitting a UTF-8 sequence
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Byte-level variant of [`truncate_utf8`] for raw frame content
pub fn preview_bytes(content: &[u8], max_bytes: usize) -> Vec<u8> {
    match std::str::from_utf8(content) {
        Ok(text) => truncate_utf8(text, max_bytes).as_bytes().to_vec(),
        Err(_) => content[..content.len().min(max_bytes)].to_vec(),
    }
}

/// Cosine similarity; 0.0 for mismatched or zero-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Blend per-frame text and vector scores and keep the best `top_k`
///
/// Text scores are normalized by the best text score so both channels sit
/// in `[0, 1]`; negative similarities count as zero.
pub fn blend_scores(
    text_scores: &[(FrameId, f32)],
    vector_scores: &[(FrameId, f32)],
    alpha: f32,
    top_k: usize,
) -> Vec<(FrameId, f32)> {
    let max_text = text_scores
        .iter()
        .map(|(_, score)| *score)
        .fold(0.0f32, f32::max);

    let mut combined: BTreeMap<FrameId, f32> = BTreeMap::new();
    for (id, score) in text_scores {
        let normalized = if max_text > 0.0 { score / max_text } else { 0.0 };
        *combined.entry(*id).or_insert(0.0) += (1.0 - alpha) * normalized;
    }
    for (id, similarity) in vector_scores {
        *combined.entry(*id).or_insert(0.0) += alpha * similarity.max(0.0);
    }

    let mut ranked: Vec<(FrameId, f32)> = combined
        .into_iter()
        .filter(|(_, score)| *score > 0.0)
        .collect();
    sort_ranked(&mut ranked);
    ranked.truncate(top_k);
    ranked
}

/// Sort by descending score; ties keep ascending frame id order
pub fn sort_ranked(ranked: &mut [(FrameId, f32)]) {
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_utf8_respects_char_boundary() {
        let text = "héllo";
        assert_eq!(truncate_utf8(text, 2), "h");
        assert_eq!(truncate_utf8(text, 3), "hé");
        assert_eq!(truncate_utf8(text, 100), "héllo");
        assert_eq!(truncate_utf8(text, 0), "");
    }

    #[test]
    fn test_preview_bytes_invalid_utf8() {
        let bytes = vec![0xff, 0xfe, 0xfd];
        assert_eq!(preview_bytes(&bytes, 2), vec![0xff, 0xfe]);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_blend_scores_weights_channels() {
        let text = vec![(1, 4.0), (2, 2.0)];
        let vector = vec![(2, 1.0), (3, 0.5)];
        let ranked = blend_scores(&text, &vector, HYBRID_ALPHA, 10);

        let score = |id: FrameId| ranked.iter().find(|(f, _)| *f == id).unwrap().1;
        assert!((score(1) - 0.6).abs() < 1e-6);
        assert!((score(2) - (0.6 * 0.5 + 0.4)).abs() < 1e-6);
        assert!((score(3) - 0.2).abs() < 1e-6);
        assert_eq!(ranked[0].0, 2);
    }

    #[test]
    fn test_blend_scores_truncates_and_drops_zero() {
        let text = vec![(1, 1.0), (2, 0.5), (3, 0.25)];
        let vector = vec![(4, -0.5)];
        let ranked = blend_scores(&text, &vector, HYBRID_ALPHA, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, 1);
        assert_eq!(ranked[1].0, 2);
    }
}
