pub mod commands;
pub mod signal;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "estuary")]
#[command(about = "A periodic RSS/Atom feed aggregator", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/estuary/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of parallel workers for fetching feeds
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the scheduler and cleanup loops until interrupted
    Run {
        /// Skip fetching feed titles on start
        #[arg(long)]
        no_sync: bool,
    },
    /// Run a single fetch cycle
    Update,
    /// Run a single cleanup pass
    Cleanup,
    /// List stored feeds
    Feeds {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List configured groups
    Groups,
    /// List items, newest first
    Items {
        /// Feed id or URL
        #[arg(long)]
        feed: Option<String>,

        /// Group label
        #[arg(long)]
        group: Option<String>,

        /// Only items added after this unix time
        #[arg(long, default_value_t = 0)]
        since: i64,

        /// Id of the last item already seen
        #[arg(long)]
        after: Option<String>,

        /// Page size
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}
