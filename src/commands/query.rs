//! `sift query` - one-shot natural-language search

use super::{SearchOptions, prepare_index, print_hits};
use anyhow::Result;
use colored::Colorize;
use sift::SiftClient;
use std::time::Instant;

/// Run a single query and print the ranked hits
pub async fn run(
    client: &SiftClient,
    options: &SearchOptions,
    query: &str,
    json: bool,
) -> Result<()> {
    let root = client.resolve_repo_root(&options.repo_path)?;
    prepare_index(client, &root, options).await?;

    let top_k = options.top_k(client.config());
    let start = Instant::now();
    let hits = client
        .search(&root, query, top_k, options.text_only)
        .await?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    if json {
        let output = serde_json::json!({
            "query": query,
            "repo_root": root,
            "elapsed_ms": elapsed_ms,
            "hits": hits,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} {}", "Query:".bold(), query.cyan());
    println!("Results: {} in {:.1}ms", hits.len(), elapsed_ms);

    if hits.is_empty() {
        println!(
            "{} No matches found. Try a broader query or run `sift tui`.",
            "→".dimmed()
        );
        return Ok(());
    }

    print_hits(&hits);
    Ok(())
}
