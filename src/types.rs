use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single commit as produced by a history reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit id
    pub hash: String,
    /// Display prefix of the commit id
    pub short_hash: String,
    /// Author name
    pub author: String,
    /// Author date (YYYY-MM-DD)
    pub date: String,
    /// First line of the commit message
    pub subject: String,
    /// Body text to index: message body, changed files, diff excerpt
    pub ingest_content: String,
}

/// A ranked result reconstructed from a stored frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub hash: String,
    pub short_hash: String,
    pub author: String,
    pub date: String,
    pub subject: String,
    pub score: f32,
    pub preview_text: String,
}

/// How an indexing run selected its commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum IndexMode {
    /// Every commit reachable from HEAD
    Full,
    /// Only commits newer than the stored watermark
    Incremental { since: String },
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexMode::Full => write!(f, "full"),
            IndexMode::Incremental { since } => {
                let short: String = since.chars().take(7).collect();
                write!(f, "incremental (since {})", short)
            }
        }
    }
}

/// Summary of one indexing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResult {
    pub repo_root: PathBuf,
    pub indexed_count: usize,
    pub elapsed_seconds: f64,
    pub mode: IndexMode,
}

impl IndexResult {
    /// Human-readable mode label, e.g. `incremental (since abc123d)`
    pub fn mode_label(&self) -> String {
        self.mode.to_string()
    }
}

/// Read-only statistics about a repository index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub repo_root: PathBuf,
    pub frame_count: u64,
    /// On-disk size of the store, if it could be measured
    pub store_size_bytes: Option<u64>,
    /// Watermark of the last successful run
    pub last_indexed: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_mode_label() {
        assert_eq!(IndexMode::Full.to_string(), "full");
    }

    #[test]
    fn test_incremental_mode_label_uses_short_watermark() {
        let mode = IndexMode::Incremental {
            since: "abc123def456".to_string(),
        };
        assert_eq!(mode.to_string(), "incremental (since abc123d)");
    }

    #[test]
    fn test_incremental_mode_label_short_input() {
        let mode = IndexMode::Incremental {
            since: "abc".to_string(),
        };
        assert_eq!(mode.to_string(), "incremental (since abc)");
    }

    #[test]
    fn test_index_result_serializes_mode_tag() {
        let result = IndexResult {
            repo_root: PathBuf::from("/repo"),
            indexed_count: 2,
            elapsed_seconds: 0.5,
            mode: IndexMode::Incremental {
                since: "abc".to_string(),
            },
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mode"]["mode"], "incremental");
        assert_eq!(json["mode"]["since"], "abc");
        assert_eq!(result.mode_label(), "incremental (since abc)");
    }
}
