use super::HistoryReader;
use super::content::{CommitDetails, IngestContentBuilder};
use crate::error::GitError;
use crate::types::Commit;
use chrono::{DateTime, FixedOffset, Utc};
use git2::{DiffOptions, ErrorCode, Oid, Repository, Sort};
use std::path::Path;

/// Number of hex digits in a short hash
const SHORT_HASH_LEN: usize = 7;

/// History reader backed by libgit2
#[derive(Debug, Clone)]
pub struct GitLogReader {
    content: IngestContentBuilder,
    include_diff: bool,
    max_diff_bytes: usize,
}

impl GitLogReader {
    pub fn new(include_diff: bool, max_diff_bytes: usize, max_content_bytes: usize) -> Self {
        Self {
            content: IngestContentBuilder::new(include_diff, max_diff_bytes, max_content_bytes),
            include_diff,
            max_diff_bytes,
        }
    }

    fn read_commit(&self, repo: &Repository, commit: &git2::Commit) -> Result<Commit, GitError> {
        let hash = commit.id().to_string();
        let short_hash: String = hash.chars().take(SHORT_HASH_LEN).collect();

        let author = commit.author();
        let author_name = String::from_utf8_lossy(author.name_bytes()).into_owned();
        let author_name = if author_name.is_empty() {
            "Unknown".to_string()
        } else {
            author_name
        };

        let subject = commit.summary().unwrap_or_default().to_string();
        let body = commit.body().unwrap_or_default().to_string();

        let (files_changed, diff) =
            self.extract_diff(repo, commit)
                .map_err(|e| GitError::ParseFailed {
                    hash: hash.clone(),
                    reason: e.message().to_string(),
                })?;

        let ingest_content = self.content.build(&CommitDetails {
            body,
            files_changed,
            diff,
        });

        Ok(Commit {
            hash,
            short_hash,
            author: author_name,
            date: format_date(author.when()),
            subject,
            ingest_content,
        })
    }

    /// Changed paths and a diff excerpt against the first parent
    fn extract_diff(
        &self,
        repo: &Repository,
        commit: &git2::Commit,
    ) -> Result<(Vec<String>, String), git2::Error> {
        let tree = commit.tree()?;
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let mut diff_opts = DiffOptions::new();
        diff_opts
            .context_lines(3)
            .interhunk_lines(0)
            .ignore_whitespace(false);

        // First commit diffs against the empty tree
        let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut diff_opts))?;

        let files_changed: Vec<String> = diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|path| path.display().to_string())
            })
            .collect();

        let mut diff_content = String::new();
        if !self.include_diff {
            return Ok((files_changed, diff_content));
        }

        // One byte past the limit so the content builder can tell it was cut
        let collect_limit = self.max_diff_bytes.saturating_add(1);
        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            if diff_content.len() >= collect_limit || line.origin() == 'B' {
                return true;
            }

            let origin = line.origin();
            match std::str::from_utf8(line.content()) {
                Ok(content) => match origin {
                    '+' | '-' | ' ' => {
                        diff_content.push(origin);
                        diff_content.push_str(content);
                    }
                    'F' | 'H' => diff_content.push_str(content),
                    _ => {}
                },
                Err(_) => tracing::debug!("Skipping diff line with invalid UTF-8"),
            }
            true
        })?;

        Ok((files_changed, diff_content))
    }
}

impl Default for GitLogReader {
    fn default() -> Self {
        Self::new(true, 8_000, 12_000)
    }
}

impl HistoryReader for GitLogReader {
    fn parse_log(
        &self,
        repo_path: &Path,
        max_count: usize,
        since: Option<&str>,
    ) -> Result<Vec<Commit>, GitError> {
        let repo = Repository::open(repo_path)
            .map_err(|e| GitError::OpenFailed(format!("{}: {}", repo_path.display(), e.message())))?;

        match repo.head() {
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                tracing::info!("Repository {} has no commits yet", repo_path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(GitError::IterFailed(e.message().to_string())),
        }

        let iter_failed = |e: git2::Error| GitError::IterFailed(e.message().to_string());

        let mut revwalk = repo.revwalk().map_err(iter_failed)?;
        revwalk
            .set_sorting(Sort::TIME | Sort::TOPOLOGICAL)
            .map_err(iter_failed)?;
        revwalk.push_head().map_err(iter_failed)?;

        if let Some(since) = since {
            let oid = Oid::from_str(since)
                .ok()
                .filter(|oid| repo.find_commit(*oid).is_ok())
                .ok_or_else(|| GitError::UnknownWatermark(since.to_string()))?;
            revwalk.hide(oid).map_err(iter_failed)?;
        }

        let max = if max_count == 0 { usize::MAX } else { max_count };
        let mut commits = Vec::new();

        for oid in revwalk.take(max) {
            let oid = oid.map_err(iter_failed)?;
            let commit = repo.find_commit(oid).map_err(iter_failed)?;
            commits.push(self.read_commit(&repo, &commit)?);

            if commits.len() % 100 == 0 {
                tracing::debug!("Read {} commits", commits.len());
            }
        }

        tracing::info!(
            "Read {} commits from {}{}",
            commits.len(),
            repo_path.display(),
            since
                .map(|s| format!(" since {}", &s[..s.len().min(SHORT_HASH_LEN)]))
                .unwrap_or_default()
        );
        Ok(commits)
    }
}

/// Author date in the author's own timezone, `YYYY-MM-DD`
fn format_date(time: git2::Time) -> String {
    let utc: DateTime<Utc> = DateTime::from_timestamp(time.seconds(), 0).unwrap_or_default();
    match FixedOffset::east_opt(time.offset_minutes() * 60) {
        Some(offset) => utc.with_timezone(&offset).format("%Y-%m-%d").to_string(),
        None => utc.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Signature, Time};
    use tempfile::TempDir;

    /// Commit `files` on HEAD with a fixed timestamp; returns the new hash
    fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str, minute: i64) -> String {
        let workdir = repo.workdir().unwrap().to_path_buf();
        let mut index = repo.index().unwrap();
        for (name, body) in files {
            std::fs::write(workdir.join(name), body).unwrap();
            index.add_path(Path::new(name)).unwrap();
        }
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature =
            Signature::new("Jane", "jane@example.com", &Time::new(1_704_067_200 + minute * 60, 0))
                .unwrap();

        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .unwrap()
            .to_string()
    }

    fn sample_repo() -> (TempDir, Repository, Vec<String>) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut hashes = Vec::new();
        hashes.push(commit_files(&repo, &[("a.txt", "one\n")], "Initial commit", 0));
        hashes.push(commit_files(
            &repo,
            &[("b.rs", "fn login() {}\n")],
            "Add login\n\nWires the login handler.",
            1,
        ));
        hashes.push(commit_files(&repo, &[("a.txt", "two\n")], "Update a", 2));
        (dir, repo, hashes)
    }

    #[test]
    fn test_parse_log_is_newest_first() {
        let (dir, _repo, hashes) = sample_repo();
        let commits = GitLogReader::default().parse_log(dir.path(), 0, None).unwrap();

        let got: Vec<&str> = commits.iter().map(|c| c.hash.as_str()).collect();
        let expected: Vec<&str> = hashes.iter().rev().map(String::as_str).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_commit_fields() {
        let (dir, _repo, hashes) = sample_repo();
        let reader = GitLogReader::new(true, 8_000, 12_000);
        let commits = reader.parse_log(dir.path(), 0, None).unwrap();
        let login = commits.iter().find(|c| c.hash == hashes[1]).unwrap();

        assert_eq!(login.short_hash, &hashes[1][..7]);
        assert_eq!(login.author, "Jane");
        assert_eq!(login.date, "2024-01-01");
        assert_eq!(login.subject, "Add login");
        assert!(login.ingest_content.starts_with("Wires the login handler."));
        assert!(login.ingest_content.contains("- b.rs"));
        assert!(login.ingest_content.contains("+fn login() {}"));
    }

    #[test]
    fn test_since_is_exclusive() {
        let (dir, _repo, hashes) = sample_repo();
        let commits = GitLogReader::default()
            .parse_log(dir.path(), 0, Some(&hashes[1]))
            .unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].hash, hashes[2]);

        let none_newer = GitLogReader::default()
            .parse_log(dir.path(), 0, Some(&hashes[2]))
            .unwrap();
        assert!(none_newer.is_empty());
    }

    #[test]
    fn test_max_count_limits_newest() {
        let (dir, _repo, hashes) = sample_repo();
        let commits = GitLogReader::default().parse_log(dir.path(), 2, None).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].hash, hashes[2]);
        assert_eq!(commits[1].hash, hashes[1]);
    }

    #[test]
    fn test_unknown_watermark() {
        let (dir, _repo, _hashes) = sample_repo();
        let result = GitLogReader::default().parse_log(
            dir.path(),
            0,
            Some("0123456789abcdef0123456789abcdef01234567"),
        );
        assert!(matches!(result, Err(GitError::UnknownWatermark(_))));

        let garbage = GitLogReader::default().parse_log(dir.path(), 0, Some("not-a-hash"));
        assert!(matches!(garbage, Err(GitError::UnknownWatermark(_))));
    }

    #[test]
    fn test_empty_repository_has_no_commits() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        let commits = GitLogReader::default().parse_log(dir.path(), 0, None).unwrap();
        assert!(commits.is_empty());
    }

    #[test]
    fn test_format_date_uses_author_offset() {
        // 2024-01-01T00:30:00Z is still Dec 31 at UTC-1
        let time = Time::new(1_704_069_000, -60);
        assert_eq!(format_date(time), "2023-12-31");
        assert_eq!(format_date(Time::new(1_704_069_000, 0)), "2024-01-01");
    }
}
