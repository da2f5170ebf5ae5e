//! CLI command implementations and shared terminal helpers

pub mod index;
pub mod interactive;
pub mod query;
pub mod stats;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use sift::paths::RepoLayout;
use sift::{Config, SearchHit, SiftClient};
use std::path::{Path, PathBuf};

/// Options shared by the commands that search
#[derive(Args, Debug, Clone)]
pub struct SearchOptions {
    /// Path to the git repository (default: current directory)
    #[arg(long = "repo-path", default_value = ".")]
    pub repo_path: PathBuf,

    /// Maximum number of search results
    #[arg(long = "top-k")]
    pub top_k: Option<usize>,

    /// Use text search only (skip embeddings)
    #[arg(long = "text-only")]
    pub text_only: bool,

    /// Do not auto-create an index when one is missing
    #[arg(long = "no-auto-index")]
    pub no_auto_index: bool,

    /// Maximum commits when auto-indexing (0 = unlimited)
    #[arg(long = "max-commits")]
    pub max_commits: Option<usize>,
}

impl SearchOptions {
    pub fn top_k(&self, config: &Config) -> usize {
        self.top_k.unwrap_or(config.search.top_k).max(1)
    }

    pub fn max_commits(&self, config: &Config) -> usize {
        self.max_commits.unwrap_or(config.history.max_commits)
    }
}

/// Load configuration and build the client the commands share
pub fn build_client() -> Result<SiftClient> {
    let config = Config::new().context("Failed to load sift configuration")?;
    Ok(SiftClient::with_config(config))
}

/// Make sure the repository has an index before searching it
///
/// A missing index is built with a progress bar unless auto-indexing is off.
/// An existing index is used as is.
pub async fn prepare_index(client: &SiftClient, root: &Path, options: &SearchOptions) -> Result<()> {
    let layout = RepoLayout::for_root(root);
    let max_commits = options.max_commits(client.config());

    if !layout.store_exists() && !options.no_auto_index {
        eprintln!(
            "No index found for {}. Building initial index...",
            root.display()
        );
        index::index_with_progress(client, root, true, max_commits, options.text_only).await?;
        return Ok(());
    }

    client
        .ensure_indexed(root, options.text_only, max_commits, !options.no_auto_index)
        .await?;
    Ok(())
}

/// Join the words of a query given on the command line
pub fn normalize_query(parts: &[String]) -> String {
    parts.join(" ").trim().to_string()
}

/// Human-readable byte count, e.g. `1.5 MB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// First non-empty lines of a preview, each clipped to `max_chars`
pub fn summarize_preview(text: &str, max_lines: usize, max_chars: usize) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(max_lines)
        .map(|line| {
            if line.chars().count() <= max_chars {
                line.to_string()
            } else {
                let clipped: String = line.chars().take(max_chars.saturating_sub(1)).collect();
                format!("{}…", clipped)
            }
        })
        .collect()
}

/// Print ranked hits the way `query` and the interactive prompt show them
pub fn print_hits(hits: &[SearchHit]) {
    for (index, hit) in hits.iter().enumerate() {
        let score = format!("{:.3}", hit.score);
        println!(
            "\n{}. [{}] {}",
            (index + 1).to_string().bold(),
            hit.short_hash.yellow(),
            hit.subject.cyan()
        );
        println!(
            "   {} {}  {} {}  {} {}",
            "Author:".dimmed(),
            hit.author,
            "Date:".dimmed(),
            hit.date,
            "Score:".dimmed(),
            score.green()
        );
        for line in summarize_preview(&hit.preview_text, 2, 120) {
            println!("   {}", line.dimmed());
        }
    }
}
