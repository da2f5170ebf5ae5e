use super::fs_lock::StoreLock;
use crate::embedding::VectorCapability;
use crate::error::{SiftError, StoreError};
use crate::paths::RepoLayout;
use crate::store::{SessionConfig, StoreEngine, StoreSession};

/// Exclusive handle on one repository's store
///
/// Holds the store lock for as long as it lives, so at most one session per
/// store exists at a time. The lock is released on drop, whichever way the
/// session ends.
pub struct RepoSession<S: StoreSession> {
    pub layout: RepoLayout,
    pub store: S,
    pub capability: VectorCapability,
    lock: StoreLock,
}

impl<S: StoreSession> RepoSession<S> {
    /// Lock the store, then open it, creating it first if it does not exist
    pub async fn open_or_create<E>(
        engine: &E,
        layout: RepoLayout,
        capability: VectorCapability,
    ) -> Result<Self, SiftError>
    where
        E: StoreEngine<Session = S>,
    {
        let lock = StoreLock::try_acquire(&layout.lock_path)?;
        let config = SessionConfig {
            vector_dimensions: capability.dimension(),
        };

        let store = if layout.store_exists() {
            engine.open(&layout.store_path, &config).await?
        } else {
            engine.create(&layout.store_path, &config).await?
        };

        Ok(Self {
            layout,
            store,
            capability,
            lock,
        })
    }

    /// Lock and open an existing store; `NotIndexed` if there is none
    pub async fn open_existing<E>(
        engine: &E,
        layout: RepoLayout,
        capability: VectorCapability,
    ) -> Result<Self, SiftError>
    where
        E: StoreEngine<Session = S>,
    {
        if !layout.store_exists() {
            return Err(SiftError::NotIndexed {
                repo_root: layout.repo_root,
            });
        }
        Self::open_or_create(engine, layout, capability).await
    }

    /// Close the store, then release the lock
    pub async fn close(self) -> Result<(), StoreError> {
        let RepoSession { store, lock, .. } = self;
        let closed = store.close().await;
        tracing::debug!("Closing session on {}", lock.path().display());
        drop(lock);
        closed
    }
}
