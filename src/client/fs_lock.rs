//! Filesystem-based locking for single-writer sessions
//!
//! Each repository's store is guarded by an exclusive `flock` on
//! `.sift/store.lock`. A second session on the same store, in this process
//! or another, fails fast instead of waiting.

use crate::error::StoreError;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Guard that holds an exclusive filesystem lock
///
/// The lock is released when this guard is dropped. If the process crashes,
/// the OS releases the flock.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Try to acquire the lock at `lock_path`, non-blocking
    ///
    /// Returns [`StoreError::Busy`] if another session holds it.
    pub fn try_acquire(lock_path: &Path) -> Result<Self, StoreError> {
        let lock_failed = |e: std::io::Error| StoreError::LockFailed(format!("{}: {}", lock_path.display(), e));

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(lock_failed)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(lock_path)
            .map_err(lock_failed)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Acquired store lock: {}", lock_path.display());
                Ok(Self {
                    file,
                    path: lock_path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock
                || e.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
            {
                tracing::debug!("Store lock held elsewhere: {}", lock_path.display());
                Err(StoreError::Busy(lock_path.display().to_string()))
            }
            Err(e) => Err(lock_failed(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // The lock file itself is kept for reuse
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::debug!("Failed to release store lock {}: {}", self.path.display(), e);
        } else {
            tracing::debug!("Released store lock: {}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_and_release() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join(".sift").join("store.lock");

        let guard = StoreLock::try_acquire(&lock_path).unwrap();
        assert_eq!(guard.path(), lock_path);
        drop(guard);

        assert!(StoreLock::try_acquire(&lock_path).is_ok());
        assert!(lock_path.exists());
    }

    #[test]
    fn test_second_session_is_busy() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("store.lock");

        let _held = StoreLock::try_acquire(&lock_path).unwrap();
        assert!(matches!(
            StoreLock::try_acquire(&lock_path),
            Err(StoreError::Busy(_))
        ));

        let other = lock_path.clone();
        let from_thread = thread::spawn(move || StoreLock::try_acquire(&other).is_err())
            .join()
            .unwrap();
        assert!(from_thread, "lock must be exclusive across threads");
    }

    #[test]
    fn test_independent_stores_do_not_contend() {
        let dir = TempDir::new().unwrap();
        let _a = StoreLock::try_acquire(&dir.path().join("a.lock")).unwrap();
        assert!(StoreLock::try_acquire(&dir.path().join("b.lock")).is_ok());
    }
}
