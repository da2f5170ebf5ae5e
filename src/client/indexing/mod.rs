//! Incremental indexing of a repository's commit history
//!
//! A run reads the watermark, asks the history reader for commits newer than
//! it, writes one frame per commit in a single store batch, and only then
//! advances the watermark. A failed run leaves both the store contents and
//! the watermark as they were, so the next run retries the same commits.

use super::SiftClient;
use super::session::RepoSession;
use crate::codec;
use crate::error::{GitError, Result, SiftError};
use crate::paths::{RepoLayout, ensure_ignored};
use crate::store::{StoreEngine, StoreSession};
use crate::types::{Commit, IndexMode, IndexResult};
use crate::watermark::{read_watermark, write_watermark};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Progress callback, called as `(processed, total)` after each commit
pub type ProgressFn<'a> = &'a (dyn Fn(usize, usize) + Send + Sync);

impl<E: StoreEngine> SiftClient<E> {
    /// Make sure a repository has an index, building one if allowed
    ///
    /// An existing store is returned as is, even if newer commits exist.
    /// Without a store, `auto_index == false` yields
    /// [`SiftError::NotIndexed`]; otherwise a full index is built.
    pub async fn ensure_indexed(
        &self,
        repo_root: &Path,
        text_only: bool,
        max_commits: usize,
        auto_index: bool,
    ) -> Result<RepoLayout> {
        let root = self.resolve_repo_root(repo_root)?;
        let layout = RepoLayout::for_root(&root);

        if layout.store_exists() {
            return Ok(layout);
        }

        if !auto_index {
            return Err(SiftError::NotIndexed { repo_root: root });
        }

        tracing::info!("No index for {}, building one", root.display());
        self.index_repository(&root, true, max_commits, text_only, None)
            .await?;
        Ok(layout)
    }

    /// Index new commits, or all commits when `full` is set
    ///
    /// `max_commits == 0` means no limit.
    pub async fn index_repository(
        &self,
        repo_root: &Path,
        full: bool,
        max_commits: usize,
        text_only: bool,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<IndexResult> {
        let start = Instant::now();
        let root = self.resolve_repo_root(repo_root)?;
        let layout = RepoLayout::for_root(&root);

        layout.create_index_dir()?;
        if let Err(e) = ensure_ignored(&root) {
            tracing::warn!("Could not update {}/.gitignore: {}", root.display(), e);
        }

        let since = if full {
            None
        } else {
            read_watermark(&layout.watermark_path).await
        };
        let mode = match &since {
            Some(hash) => IndexMode::Incremental {
                since: hash.clone(),
            },
            None => IndexMode::Full,
        };

        tracing::info!("Indexing {} ({})", root.display(), mode);

        let mut commits = self.read_history(&root, max_commits, since).await?;
        if max_commits > 0 {
            commits.truncate(max_commits);
        }

        if commits.is_empty() {
            tracing::info!("No new commits to index");
            return Ok(IndexResult {
                repo_root: root,
                indexed_count: 0,
                elapsed_seconds: start.elapsed().as_secs_f64(),
                mode,
            });
        }

        let capability = self.vector_capability(text_only).await;
        let mut session = RepoSession::open_or_create(&*self.engine, layout, capability).await?;

        if let Err(e) = ingest(&mut session, &commits, progress).await {
            // Staged frames are never committed, so the store is unchanged
            if let Err(close_err) = session.close().await {
                tracing::warn!("Failed to close store after error: {}", close_err);
            }
            return Err(e);
        }

        // The first commit is the newest one
        let newest = commits[0].hash.clone();
        let persisted = write_watermark(&session.layout.watermark_path, &newest).await;
        session.close().await?;
        if let Err(e) = persisted {
            tracing::error!(
                "Frames were committed but the watermark could not be written; \
                 the next run will index them again: {}",
                e
            );
            return Err(e.into());
        }

        let result = IndexResult {
            repo_root: root,
            indexed_count: commits.len(),
            elapsed_seconds: start.elapsed().as_secs_f64(),
            mode,
        };
        tracing::info!(
            "Indexed {} commits in {:.2}s",
            result.indexed_count,
            result.elapsed_seconds
        );
        Ok(result)
    }

    async fn read_history(
        &self,
        root: &Path,
        max_commits: usize,
        since: Option<String>,
    ) -> Result<Vec<Commit>> {
        let history = Arc::clone(&self.history);
        let root: PathBuf = root.to_path_buf();

        let commits = tokio::task::spawn_blocking(move || {
            history.parse_log(&root, max_commits, since.as_deref())
        })
        .await
        .map_err(|e| GitError::TaskFailed(e.to_string()))??;

        Ok(commits)
    }
}

/// Stage one frame per commit, then commit the batch
async fn ingest<S: StoreSession>(
    session: &mut RepoSession<S>,
    commits: &[Commit],
    progress: Option<ProgressFn<'_>>,
) -> Result<()> {
    let total = commits.len();
    let repo_name = session.layout.repo_name();
    let identity = session.capability.identity();

    for (index, commit) in commits.iter().enumerate() {
        let content = codec::encode(commit);
        let metadata = codec::frame_metadata(commit, &repo_name);
        let embedding = session.capability.embed(&content).await?;

        let frame_id = session
            .store
            .put(
                content.clone().into_bytes(),
                embedding,
                identity.as_deref(),
                metadata,
            )
            .await?;
        session.store.index_text(frame_id, &content).await?;

        tracing::debug!("Staged commit {} as frame {}", commit.short_hash, frame_id);
        if let Some(report) = progress {
            report(index + 1, total);
        }
    }

    session.store.commit().await?;
    Ok(())
}
