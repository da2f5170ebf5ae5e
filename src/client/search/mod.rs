//! Hybrid search over an indexed repository
//!
//! The query is embedded when a model is available and blended with text
//! relevance; otherwise ranking is by text alone. Every result is turned
//! back into a [`SearchHit`] from the best text the store can give for it.

use super::SiftClient;
use super::session::RepoSession;
use crate::codec;
use crate::config::SearchConfig;
use crate::embedding::VectorCapability;
use crate::error::{Result, SiftError};
use crate::paths::RepoLayout;
use crate::store::{
    HYBRID_ALPHA, SearchMode, SearchRequest, StoreEngine, StoreSearchResult, StoreSession,
};
use crate::types::SearchHit;
use std::path::Path;

impl<E: StoreEngine> SiftClient<E> {
    /// Search an indexed repository; the index must already exist
    pub async fn search(
        &self,
        repo_root: &Path,
        query: &str,
        top_k: usize,
        text_only: bool,
    ) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SiftError::Validation("query must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(SiftError::Validation(
                "top_k must be at least 1".to_string(),
            ));
        }

        let root = self.resolve_repo_root(repo_root)?;
        let layout = RepoLayout::for_root(&root);
        if !layout.store_exists() {
            return Err(SiftError::NotIndexed { repo_root: root });
        }

        let capability = self.vector_capability(text_only).await;
        let session = RepoSession::open_existing(&*self.engine, layout, capability).await?;

        let hits = search_session(
            &session.store,
            &session.capability,
            query,
            top_k,
            &self.config.search,
        )
        .await;
        session.close().await?;
        hits
    }
}

/// Build the store request for a query
pub fn build_request(
    query: &str,
    embedding: Option<Vec<f32>>,
    identity: Option<String>,
    top_k: usize,
    preview_max_bytes: usize,
) -> SearchRequest {
    let mode = if embedding.is_some() {
        SearchMode::Hybrid {
            alpha: HYBRID_ALPHA,
        }
    } else {
        SearchMode::TextOnly
    };

    SearchRequest {
        query: query.to_string(),
        embedding,
        identity,
        mode,
        top_k,
        preview_max_bytes,
    }
}

/// Run one query against an open store and decode the ranked results
pub async fn search_session<S: StoreSession>(
    store: &S,
    capability: &VectorCapability,
    query: &str,
    top_k: usize,
    options: &SearchConfig,
) -> Result<Vec<SearchHit>> {
    let embedding = capability.embed(query).await?;
    let request = build_request(
        query,
        embedding,
        capability.identity(),
        top_k,
        options.preview_bytes,
    );

    tracing::debug!(
        "Searching for '{}' ({:?}, top_k={})",
        query,
        request.mode,
        top_k
    );

    let results = store.search(&request).await?;
    if results.is_empty() {
        return Ok(Vec::new());
    }

    let mut hits = Vec::with_capacity(results.len());
    for result in &results {
        let text = display_text(store, result, options.fallback_preview_bytes).await;
        hits.push(codec::decode(&text, result.score));
    }
    Ok(hits)
}

/// First non-empty of: full content, inline preview, explicit preview fetch
///
/// Lookup failures fall through to the next source; a result whose sources
/// are all empty or unavailable yields `""`.
pub async fn display_text<S: StoreSession>(
    store: &S,
    result: &StoreSearchResult,
    fallback_preview_bytes: usize,
) -> String {
    match store.frame_content(result.frame_id).await {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) if !text.is_empty() => return text,
            Ok(_) => {}
            Err(_) => tracing::debug!("Frame {} content is not UTF-8", result.frame_id),
        },
        Err(e) => tracing::debug!("Frame {} content unavailable: {}", result.frame_id, e),
    }

    if let Some(preview) = result.preview_text.as_deref()
        && !preview.is_empty()
    {
        return preview.to_string();
    }

    match store
        .frame_preview(result.frame_id, fallback_preview_bytes)
        .await
    {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::warn!("No preview available for frame {}: {}", result.frame_id, e);
            String::new()
        }
    }
}
