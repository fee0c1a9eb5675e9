pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "roost")]
#[command(about = "A registry for twtxt-style plain-text social feeds", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a feed
    Add {
        /// Nickname of the feed's author
        nick: String,
        /// URL of the feed document
        url: String,
    },
    /// Remove a feed from the registry and the durable store
    Remove {
        /// URL of the feed to remove
        url: String,
    },
    /// List every registered feed
    List,
    /// Re-crawl every registered feed once
    Refresh,
    /// Search the registry
    Query {
        #[command(subcommand)]
        query: QueryCommand,
    },
    /// Background daemon for periodic refreshes
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
pub enum QueryCommand {
    /// Feeds whose nick contains the given text (case-sensitive)
    User {
        name: String,
    },
    /// Posts carrying the given hashtag (exact, case-sensitive)
    Tag {
        tag: String,
    },
    /// Posts containing the given text
    Status {
        term: String,

        /// Also match the term first-letter-capitalized and fully
        /// upper-cased, deduplicating the combined results
        #[arg(long)]
        all_casings: bool,

        /// Drop results containing this text (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Start the daemon in the foreground
    Start {
        /// Refresh interval (e.g., "1h", "30m", "6h", "1d").
        /// Defaults to `refresh_interval` from the config file.
        #[arg(short, long)]
        interval: Option<String>,

        /// Skip the initial refresh on start
        #[arg(long)]
        no_initial_refresh: bool,
    },
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
}
