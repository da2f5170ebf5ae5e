//! `sift index` - build or refresh the commit index

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sift::{IndexResult, SiftClient};
use std::path::Path;

/// Run the index command
pub async fn run(
    client: &SiftClient,
    repo_path: &Path,
    full: bool,
    max_commits: Option<usize>,
    text_only: bool,
) -> Result<()> {
    let root = client.resolve_repo_root(repo_path)?;
    let max_commits = max_commits.unwrap_or(client.config().history.max_commits);

    index_with_progress(client, &root, full, max_commits, text_only).await?;
    Ok(())
}

/// Index a resolved repository root, drawing a progress bar on stderr
pub async fn index_with_progress(
    client: &SiftClient,
    root: &Path,
    full: bool,
    max_commits: usize,
    text_only: bool,
) -> Result<IndexResult> {
    println!("Indexing {}...", root.display());

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("  [{bar:30.cyan/blue}] {pos}/{len} ({percent}%) {eta}")?
            .progress_chars("#>-"),
    );
    let report = |processed: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(processed as u64);
    };

    let outcome = client
        .index_repository(root, full, max_commits, text_only, Some(&report))
        .await;
    bar.finish_and_clear();
    let result = outcome?;

    if result.indexed_count == 0 {
        println!("No new commits to index [{}].", result.mode_label());
    } else {
        println!(
            "{} Indexed {} commit{} in {:.1}s [{}]",
            "✓".green(),
            result.indexed_count,
            if result.indexed_count == 1 { "" } else { "s" },
            result.elapsed_seconds,
            result.mode_label()
        );
    }
    Ok(result)
}
