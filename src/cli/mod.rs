//! CLI module for Finn.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Finn - progressive search over video transcripts
///
/// Searches an index of video transcripts, falling back to semantic search and
/// progressively wider rewrites of the query when exact matching finds nothing.
#[derive(Parser, Debug)]
#[command(name = "finn")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "FINN_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search indexed videos
    Search {
        /// Search query
        query: String,

        /// Only return videos from this channel (repeatable)
        #[arg(long = "channel")]
        channels: Vec<String>,

        /// Maximum number of results (defaults to search.default_limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// User whose search history is used to re-rank results
        #[arg(short, long, env = "FINN_USER")]
        user: Option<String>,

        /// Maximum number of widening strategies to try (1-4)
        #[arg(long)]
        max_level: Option<usize>,

        /// Print the result envelope as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import videos from a JSON file
    Import {
        /// JSON array of {video, title, channel_id, channel_name?, publish_date, transcript}
        file: String,

        /// Compute embeddings for hybrid search
        #[arg(long)]
        embed: bool,
    },

    /// List indexed videos
    List,

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Start MCP server for AI assistant integration
    Mcp,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "search.sparse_threshold")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_command() {
        let cli = Cli::try_parse_from([
            "finn", "-vv", "search", "policy gradients", "--channel", "UC1", "--channel", "UC2",
            "--limit", "5", "--json",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Search {
                query,
                channels,
                limit,
                json,
                max_level,
                ..
            } => {
                assert_eq!(query, "policy gradients");
                assert_eq!(channels, vec!["UC1".to_string(), "UC2".to_string()]);
                assert_eq!(limit, Some(5));
                assert!(json);
                assert_eq!(max_level, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::try_parse_from(["finn", "config", "set", "search.context_boost", "0.75"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Set { .. }
            }
        ));
    }
}
