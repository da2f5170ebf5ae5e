//! # Sift - Semantic Search over Git History
//!
//! Sift indexes the commits of a git repository into a local store and
//! answers natural-language queries over them, ranking commits by a blend of
//! keyword relevance and embedding similarity.
//!
//! ## Overview
//!
//! Each commit becomes one *frame*: a small UTF-8 document holding a
//! structured header (hash, author, date, subject) followed by the commit
//! body, the list of changed files and a truncated diff. Frames are written
//! in a single atomic batch per indexing run, and a watermark file records the
//! newest commit processed so the next run only picks up newer commits.
//!
//! ## Key Features
//!
//! - **Incremental Indexing**: watermark-driven, newest-first, at-least-once
//! - **Hybrid Search**: BM25 text relevance blended with cosine similarity
//! - **Local Embeddings**: FastEmbed (all-MiniLM-L6-v2), optional
//! - **Text-only Fallback**: works without a model, or when one fails to load
//! - **Single Writer**: store sessions hold an exclusive file lock
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐
//! │   sift CLI    │  query / index / stats / tui
//! └───────┬───────┘
//!         │
//! ┌───────▼───────┐
//! │  SiftClient   │  indexing, search, stats
//! └───────┬───────┘
//!         │
//!    ┌────┴──────┬────────────┬─────────────┐
//!    │           │            │             │
//! ┌──▼───┐  ┌────▼────┐  ┌────▼────┐  ┌─────▼─────┐
//! │ git2 │  │  codec  │  │ Tantivy │  │ FastEmbed │
//! │walker│  │ (frame) │  │  store  │  │ (optional)│
//! └──────┘  └─────────┘  └─────────┘  └───────────┘
//! ```
//!
//! ## Modules
//!
//! - [`client`]: indexing coordinator, search orchestrator and stats
//! - [`codec`]: commit frame encoding and total decoding
//! - [`store`]: store engine traits, Tantivy and in-memory engines
//! - [`git`]: repository resolution and history reading
//! - [`embedding`]: embedding providers and the vector capability
//! - [`config`]: configuration file and environment overrides
//! - [`paths`]: on-disk index layout
//! - [`watermark`]: last-indexed commit persistence
//! - [`types`]: commits, hits and run summaries
//! - [`error`]: error types and result aliases
//!
//! ## Usage Example
//!
//! ```no_run
//! use sift::SiftClient;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SiftClient::new()?;
//!     let root = client.resolve_repo_root(Path::new("."))?;
//!
//!     let result = client.index_repository(&root, false, 0, false, None).await?;
//!     println!("Indexed {} commits ({})", result.indexed_count, result.mode_label());
//!
//!     for hit in client.search(&root, "when did we add notifications", 5, false).await? {
//!         println!("[{}] {} ({:.3})", hit.short_hash, hit.subject, hit.score);
//!     }
//!     Ok(())
//! }
//! ```

/// Indexing, search and stats over a repository index
pub mod client;

/// Commit frame encoding and decoding
pub mod codec;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation using FastEmbed
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Git repository resolution and history reading
pub mod git;

/// On-disk index layout and `.gitignore` upkeep
pub mod paths;

/// Frame store abstraction with Tantivy and in-memory engines
pub mod store;

/// Commits, search hits and run summaries
pub mod types;

/// Last-indexed commit persistence
pub mod watermark;

pub use client::SiftClient;
pub use config::Config;
pub use error::{Result, SiftError};
pub use types::{Commit, IndexMode, IndexResult, IndexStats, SearchHit};
