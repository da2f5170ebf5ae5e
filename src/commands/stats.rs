//! `sift stats` - index statistics

use super::format_bytes;
use anyhow::Result;
use colored::Colorize;
use sift::{SiftClient, SiftError};
use std::path::Path;

pub async fn run(client: &SiftClient, repo_path: &Path, json: bool) -> Result<()> {
    let root = client.resolve_repo_root(repo_path)?;

    let stats = match client.index_stats(&root).await {
        Ok(stats) => stats,
        Err(SiftError::NotIndexed { repo_root }) => {
            println!(
                "No index found. Run `sift index --repo-path {}` first.",
                repo_root.display()
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let size = stats
        .store_size_bytes
        .map(format_bytes)
        .unwrap_or_else(|| "unknown".to_string());

    println!("{}", "sift index stats".bold());
    println!("─────────────────────");
    println!("  Repository:    {}", stats.repo_root.display());
    println!("  Frames:        {}", stats.frame_count);
    println!("  Store size:    {}", size);
    if let Some(hash) = &stats.last_indexed {
        let short: String = hash.chars().take(12).collect();
        println!("  Last indexed:  {}", short.yellow());
    }
    Ok(())
}
