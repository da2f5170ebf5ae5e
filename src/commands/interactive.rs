//! `sift tui` - line-oriented interactive search prompt

use super::{SearchOptions, prepare_index, print_hits};
use anyhow::Result;
use colored::Colorize;
use sift::SiftClient;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_COMMANDS: [&str; 4] = ["exit", "quit", ":q", "\\q"];

/// Read queries from stdin until EOF or an exit command
pub async fn run(client: &SiftClient, options: &SearchOptions) -> Result<()> {
    let root = client.resolve_repo_root(&options.repo_path)?;
    prepare_index(client, &root, options).await?;
    let top_k = options.top_k(client.config());

    println!(
        "{} {}",
        "sift".bold().cyan(),
        format!("interactive search over {}", root.display()).dimmed()
    );
    println!("{}", "Type a question about the history, or `exit` to quit.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", "sift>".green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if EXIT_COMMANDS.contains(&query) {
            break;
        }

        // A failed query is reported and the prompt stays open
        match client.search(&root, query, top_k, options.text_only).await {
            Ok(hits) if hits.is_empty() => {
                println!("{} No matches found. Try a broader query.", "→".dimmed());
            }
            Ok(hits) => print_hits(&hits),
            Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
        }
    }

    Ok(())
}
