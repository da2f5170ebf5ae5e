//! Git history access
//!
//! Resolves repository roots and reads commits newest-first, turning each
//! one into a [`Commit`](crate::types::Commit) with searchable ingest content.

/// Ingest content assembly for a single commit
pub mod content;
/// Git repository walking and commit extraction
pub mod walker;

pub use content::IngestContentBuilder;
pub use walker::GitLogReader;

use crate::error::GitError;
use crate::types::Commit;
use git2::Repository;
use std::path::{Path, PathBuf};

/// Source of commit history for an indexing run
pub trait HistoryReader: Send + Sync {
    /// Commits reachable from HEAD, newest first
    ///
    /// `max_count == 0` means no limit. When `since` is given, only commits
    /// strictly newer than it are returned.
    fn parse_log(
        &self,
        repo_path: &Path,
        max_count: usize,
        since: Option<&str>,
    ) -> Result<Vec<Commit>, GitError>;

    /// Working tree root of the repository containing `path`
    fn resolve_root(&self, path: &Path) -> Result<PathBuf, GitError> {
        resolve_repo_root(path)
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Resolve any path inside a repository to its working tree root
pub fn resolve_repo_root(path: &Path) -> Result<PathBuf, GitError> {
    let path = expand_tilde(path);

    let repo = Repository::discover(&path)
        .map_err(|e| GitError::RepoNotFound(format!("{}: {}", path.display(), e.message())))?;

    let workdir = repo
        .workdir()
        .ok_or_else(|| GitError::BareRepository(repo.path().display().to_string()))?;

    // Strip the trailing separator git2 leaves on workdir paths
    let root = workdir.components().collect::<PathBuf>();
    tracing::debug!("Resolved repository root: {}", root.display());
    Ok(root)
}
