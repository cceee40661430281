use crate::{
    config::{DEFAULT_API_BASE, DEFAULT_WS_BASE},
    types::{FeedbackFilters, Sentiment, Urgency},
};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "triage-feed",
    about = "live feed client and terminal dashboard for ai-triaged customer feedback",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Base address of the live push endpoint (`/ws/feedbacks` is appended)
    #[arg(
        long,
        env = "TRIAGE_WS_URL",
        default_value = DEFAULT_WS_BASE,
        global = true
    )]
    pub ws_url: String,

    /// Base address of the feedback REST api
    #[arg(
        long,
        env = "TRIAGE_API_URL",
        default_value = DEFAULT_API_BASE,
        global = true
    )]
    pub api_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Enable metrics server
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Metrics server port
    #[arg(long, default_value = "9090", global = true)]
    pub metrics_port: u16,

    /// REST request timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    pub timeout: u64,

    /// Delay before reconnecting the live feed, in milliseconds
    #[arg(long, default_value = "3000", global = true)]
    pub reconnect_delay_ms: u64,

    /// Maximum number of consecutive reconnection attempts (0 for unlimited)
    #[arg(long, default_value = "0", global = true)]
    pub max_reconnects: u32,

    /// Output format: table, json, minimal
    #[arg(long, default_value = "table", global = true)]
    pub format: String,

    /// Disable colored output (useful for piping to files)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode - records only, no banners or status lines
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Stream newly created feedback as it arrives
    Watch {
        #[command(flatten)]
        filters: FilterArgs,

        /// Stop after this many records (0 for unlimited)
        #[arg(long, default_value = "0")]
        max_records: u64,
    },

    /// List triaged feedback
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Page size (1-100)
        #[arg(long, default_value = "50")]
        limit: u32,

        /// Number of records to skip
        #[arg(long, default_value = "0")]
        skip: u32,
    },

    /// Show a single feedback record
    Get {
        /// Feedback id
        id: String,
    },

    /// Submit feedback for analysis
    Submit {
        /// Customer name
        #[arg(long)]
        name: String,

        /// Customer email
        #[arg(long)]
        email: String,

        /// Feedback text
        #[arg(long)]
        message: String,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only show this urgency (low, medium, high)
    #[arg(long)]
    pub urgency: Option<Urgency>,

    /// Only show this category
    #[arg(long)]
    pub category: Option<String>,

    /// Only show this sentiment (positive, neutral, negative)
    #[arg(long)]
    pub sentiment: Option<Sentiment>,

    /// Only show records that already carry an analysis
    #[arg(long)]
    pub unresolved_only: bool,
}

impl From<&FilterArgs> for FeedbackFilters {
    fn from(args: &FilterArgs) -> Self {
        FeedbackFilters {
            urgency: args.urgency,
            category: args.category.clone(),
            sentiment: args.sentiment,
            unresolved_only: args.unresolved_only,
        }
    }
}
