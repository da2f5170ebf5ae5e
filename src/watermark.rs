//! Persisted watermark: the hash of the newest commit in the last
//! successfully committed batch.

use std::io;
use std::path::Path;

/// Read the watermark; `None` when missing, unreadable or blank
pub async fn read_watermark(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let hash = content.trim();
            if hash.is_empty() {
                None
            } else {
                Some(hash.to_string())
            }
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(
                "Ignoring unreadable watermark {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Replace the watermark atomically via a temp file and rename
pub async fn write_watermark(path: &Path, hash: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, hash.trim()).await?;
    tokio::fs::rename(&tmp, path).await?;

    tracing::debug!("Watermark set to {}", hash.trim());
    Ok(())
}
