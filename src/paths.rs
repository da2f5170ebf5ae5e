/// Path computation for per-repository index state and user configuration
///
/// Everything sift writes for a repository lives under `<root>/.sift/`; the
/// layout is a pure function of the repository root.
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Name of the per-repository index directory
pub const INDEX_DIR_NAME: &str = ".sift";

const STORE_NAME: &str = "store";
const WATERMARK_NAME: &str = "last-indexed-hash";
const LOCK_NAME: &str = "store.lock";

/// Where a repository's index state lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    pub repo_root: PathBuf,
    /// `<root>/.sift`
    pub index_dir: PathBuf,
    /// `<root>/.sift/store`
    pub store_path: PathBuf,
    /// `<root>/.sift/last-indexed-hash`
    pub watermark_path: PathBuf,
    /// `<root>/.sift/store.lock`
    pub lock_path: PathBuf,
}

impl RepoLayout {
    pub fn for_root(repo_root: &Path) -> Self {
        let index_dir = repo_root.join(INDEX_DIR_NAME);
        Self {
            repo_root: repo_root.to_path_buf(),
            store_path: index_dir.join(STORE_NAME),
            watermark_path: index_dir.join(WATERMARK_NAME),
            lock_path: index_dir.join(LOCK_NAME),
            index_dir,
        }
    }

    /// The store's existence is the only "index exists" signal
    pub fn store_exists(&self) -> bool {
        self.store_path.exists()
    }

    /// Final path component of the repository root, used as the repo name
    pub fn repo_name(&self) -> String {
        self.repo_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.repo_root.display().to_string())
    }

    pub fn create_index_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.index_dir)
    }
}

/// Add the index directory to the repository's `.gitignore`
///
/// Returns `true` when an entry was appended, `false` when one was already
/// present.
pub fn ensure_ignored(repo_root: &Path) -> io::Result<bool> {
    let gitignore = repo_root.join(".gitignore");
    let existing = match fs::read_to_string(&gitignore) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let already_ignored = existing.lines().any(|line| {
        let entry = line.trim().trim_start_matches('/').trim_end_matches('/');
        entry == INDEX_DIR_NAME
    });
    if already_ignored {
        return Ok(false);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&gitignore)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    writeln!(file, "{}/", INDEX_DIR_NAME)?;

    tracing::debug!("Added {}/ to {}", INDEX_DIR_NAME, gitignore.display());
    Ok(true)
}

/// Platform-agnostic user directories
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Returns: {config_dir}/sift
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join("sift")
    }

    /// Returns: {config_dir}/sift/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}
