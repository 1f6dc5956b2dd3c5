//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Mail Dispatch - reliable email dispatch with retry, failover and rate limiting
#[derive(Parser, Debug)]
#[command(
    name = "mail-dispatch",
    author,
    version,
    about = "Reliable email dispatch with retry, failover and rate limiting",
    long_about = "Sends emails through an ordered pool of delivery backends.\n\n\
                  Failed attempts are retried with exponential backoff, backends are \n\
                  rotated once their retry budget is spent, already-delivered ids are \n\
                  never resent, and attempts are kept under a sliding-window rate limit."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MAIL_DISPATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "MAIL_DISPATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a single email
    Send(SendArgs),

    /// Send a batch of generated emails concurrently through one dispatcher
    Batch(BatchArgs),

    /// Validate configuration file without sending
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Write a starter configuration file
    Init(InitArgs),
}

/// Options shared by commands that build a dispatcher
#[derive(Args, Debug, Clone)]
pub struct DispatchArgs {
    /// Path to configuration file (TOML or JSON); built-in demo providers if omitted
    #[arg(short, long, env = "MAIL_DISPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override consecutive attempts per backend
    #[arg(long, env = "MAIL_DISPATCH_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Override accepted attempts per rate window
    #[arg(long, env = "MAIL_DISPATCH_RATE_LIMIT")]
    pub rate_limit: Option<usize>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MAIL_DISPATCH_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `send` command
#[derive(Parser, Debug, Clone)]
pub struct SendArgs {
    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Recipient address
    #[arg(long)]
    pub to: String,

    /// Subject line
    #[arg(long, default_value = "")]
    pub subject: String,

    /// Message body
    #[arg(long, default_value = "")]
    pub body: String,

    /// Idempotency key (default: "<to>-<unix millis>")
    #[arg(long)]
    pub id: Option<String>,

    /// Abandon the send after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "MAIL_DISPATCH_TIMEOUT")]
    pub timeout: u64,
}

/// Arguments for the `batch` command
#[derive(Parser, Debug, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Number of distinct emails to send
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Re-send every email once more after the batch completes
    #[arg(long)]
    pub duplicates: bool,

    /// Recipient domain for generated addresses
    #[arg(long, default_value = "example.com")]
    pub domain: String,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "dispatch.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in demo providers if omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `init` command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Destination (.toml or .json)
    #[arg(short, long, default_value = "dispatch.toml")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
