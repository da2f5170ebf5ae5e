use super::SiftClient;
use super::session::RepoSession;
use crate::embedding::VectorCapability;
use crate::error::{Result, SiftError};
use crate::paths::RepoLayout;
use crate::store::{StoreEngine, StoreSession};
use crate::types::IndexStats;
use crate::watermark::read_watermark;
use std::path::Path;
use walkdir::WalkDir;

impl<E: StoreEngine> SiftClient<E> {
    /// Frame count, on-disk size and watermark of a repository's index
    pub async fn index_stats(&self, repo_root: &Path) -> Result<IndexStats> {
        let root = self.resolve_repo_root(repo_root)?;
        let layout = RepoLayout::for_root(&root);
        if !layout.store_exists() {
            return Err(SiftError::NotIndexed { repo_root: root });
        }

        // Reading counts never needs the embedding model
        let session =
            RepoSession::open_existing(&*self.engine, layout, VectorCapability::TextOnly).await?;
        let store_stats = session.store.stats().await;
        let store_size_bytes = store_size(&session.layout.store_path);
        let last_indexed = read_watermark(&session.layout.watermark_path).await;
        session.close().await?;

        Ok(IndexStats {
            repo_root: root,
            frame_count: store_stats?.frame_count,
            store_size_bytes,
            last_indexed,
        })
    }
}

/// Total size of the files under the store path
fn store_size(store_path: &Path) -> Option<u64> {
    let mut total = 0u64;
    for entry in WalkDir::new(store_path) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Cannot measure {}: {}", store_path.display(), e);
                return None;
            }
        };
        if entry.file_type().is_file() {
            total += entry.metadata().ok()?.len();
        }
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::{StubHistory, commit, text_only_client};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_stats_after_indexing() {
        let dir = TempDir::new().unwrap();
        let client = text_only_client(StubHistory::new(vec![
            commit("c2", "Second"),
            commit("c1", "First"),
        ]));
        client
            .index_repository(dir.path(), false, 0, true, None)
            .await
            .unwrap();

        let stats = client.index_stats(dir.path()).await.unwrap();
        assert_eq!(stats.frame_count, 2);
        assert_eq!(stats.last_indexed.as_deref(), Some("c2"));
        assert_eq!(stats.repo_root, dir.path());
        assert!(stats.store_size_bytes.is_some());
    }

    #[tokio::test]
    async fn test_stats_without_index() {
        let dir = TempDir::new().unwrap();
        let client = text_only_client(StubHistory::new(Vec::new()));
        let err = client.index_stats(dir.path()).await.unwrap_err();
        assert!(matches!(err, SiftError::NotIndexed { .. }));
    }

    #[test]
    fn test_store_size_sums_files() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        std::fs::create_dir_all(store.join("segments")).unwrap();
        std::fs::write(store.join("meta.json"), b"12345").unwrap();
        std::fs::write(store.join("segments").join("a.idx"), b"1234567890").unwrap();
        assert_eq!(store_size(&store), Some(15));
        assert_eq!(store_size(&dir.path().join("missing")), None);
    }
}
