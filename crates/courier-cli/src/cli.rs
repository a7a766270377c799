use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use courier_core::SyncStatus;

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Capture records offline and deliver them to a remote service")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Remote endpoint base URL (overrides COURIER_REMOTE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub remote: Option<String>,

    /// Quick capture: courier "my record title"
    #[arg(trailing_var_arg = true)]
    pub record: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new record
    #[command(alias = "new")]
    Add {
        /// Record title
        title: String,
        /// Record body text
        body: Vec<String>,
    },
    /// List recent records
    List {
        /// Number of records to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Filter records by delivery status
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single record
    Show {
        /// Record ID or unique ID prefix
        id: String,
    },
    /// Deliver pending records to the remote service
    Sync,
    /// Requeue failed records and deliver them
    Retry,
    /// Show record counts per delivery status
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    Pending,
    Syncing,
    Synced,
    Failed,
}

impl From<StatusFilter> for SyncStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Pending => Self::Pending,
            StatusFilter::Syncing => Self::Syncing,
            StatusFilter::Synced => Self::Synced,
            StatusFilter::Failed => Self::Failed,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
