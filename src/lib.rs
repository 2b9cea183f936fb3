//! Finn - progressive search over video transcripts
//!
//! A local-first tool for searching an index of YouTube video transcripts.
//! When an exact keyword search comes up empty, Finn falls back to semantic
//! search and then to a fixed ladder of query rewrites, and reports which
//! technique produced the results.
//!
//! # Architecture
//!
//! - `search` - Query types, the widening ladder, merging and re-ranking
//! - `orchestrator` - The exact → hybrid → widened decision procedure
//! - `retriever` - Keyword and semantic retrievers over a video store
//! - `store` - Video storage (SQLite FTS5 or in-memory) and search history
//! - `embedding` - Embedding generation (OpenAI, Ollama)
//! - `context` - Per-user search context for re-ranking
//! - `library` - Store plus pipeline, used by the CLI, HTTP and MCP surfaces
//! - `config` - Settings and the synonym/concept vocabulary
//!
//! # Example
//!
//! ```rust,no_run
//! use finn::config::Settings;
//! use finn::library::Library;
//! use finn::search::SearchQuery;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let library = Library::open(&settings).await?;
//!
//!     let envelope = library.search(&SearchQuery::new("VERL volcano engine")).await?;
//!     println!("{}", envelope.explanation);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod embedding;
pub mod error;
pub mod library;
pub mod mcp;
pub mod orchestrator;
pub mod retriever;
pub mod search;
pub mod store;

pub use error::{FinnError, Result};
