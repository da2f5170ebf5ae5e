mod commands;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use commands::SearchOptions;
use sift::SiftError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Semantic search over git history", long_about = None)]
#[command(
    after_help = "Run `sift tui` for interactive mode, or ask directly: `sift when did we add notifications`."
)]
#[command(version, long_version = LONG_VERSION)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Log progress details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Query to run when no subcommand is given
    #[command(flatten)]
    query: QueryArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a one-shot natural-language query over git history
    Query(QueryArgs),

    /// Index git history for semantic search
    Index {
        /// Path to the git repository (default: current directory)
        #[arg(long = "repo-path", default_value = ".")]
        repo_path: PathBuf,

        /// Re-index from scratch, ignoring previous progress
        #[arg(long)]
        full: bool,

        /// Maximum number of commits to index (0 = unlimited)
        #[arg(long = "max-commits")]
        max_commits: Option<usize>,

        /// Use text search only (skip embeddings)
        #[arg(long = "text-only")]
        text_only: bool,
    },

    /// Show index statistics
    Stats {
        /// Path to the git repository (default: current directory)
        #[arg(long = "repo-path", default_value = ".")]
        repo_path: PathBuf,

        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Interactive search prompt
    Tui {
        #[command(flatten)]
        options: SearchOptions,
    },
}

#[derive(Args, Debug, Clone)]
struct QueryArgs {
    #[command(flatten)]
    options: SearchOptions,

    /// JSON output
    #[arg(long)]
    json: bool,

    /// Natural-language query; empty starts the interactive prompt
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = commands::build_client()?;

    match cli.command.unwrap_or(Commands::Query(cli.query)) {
        Commands::Query(args) => {
            let query = commands::normalize_query(&args.query);
            if query.is_empty() {
                commands::interactive::run(&client, &args.options).await
            } else {
                commands::query::run(&client, &args.options, &query, args.json).await
            }
        }
        Commands::Index {
            repo_path,
            full,
            max_commits,
            text_only,
        } => commands::index::run(&client, &repo_path, full, max_commits, text_only).await,
        Commands::Stats { repo_path, json } => {
            commands::stats::run(&client, &repo_path, json).await
        }
        Commands::Tui { options } => commands::interactive::run(&client, &options).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Errors the user can act on read better without the cause chain
            match e.downcast_ref::<SiftError>() {
                Some(sift_err) if sift_err.is_user_error() => {
                    eprintln!("{} {}", "error:".red().bold(), sift_err)
                }
                _ => eprintln!("{} {:#}", "error:".red().bold(), e),
            }
            ExitCode::FAILURE
        }
    }
}
