//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Crowdmeter - crowd telemetry pipeline
#[derive(Parser, Debug)]
#[command(
    name = "crowdmeter",
    author,
    version,
    about = "Crowd telemetry pipeline",
    long_about = "A three-stage crowd telemetry pipeline.\n\n\
                  Publishes encoded video frames onto a QoS-aware bus, derives \n\
                  occupancy counts per frame, and collects latency/throughput \n\
                  metrics with an append-only count log."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CROWDMETER_VERBOSE")]
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
        env = "CROWDMETER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the telemetry pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "config.toml", env = "CROWDMETER_CONFIG")]
    pub config: PathBuf,

    /// Override source path/URI from configuration
    #[arg(long, env = "CROWDMETER_SOURCE")]
    pub source: Option<String>,

    /// Override camera identifier from configuration
    #[arg(long, env = "CROWDMETER_CAMERA_ID")]
    pub camera_id: Option<String>,

    /// Override detection model variant from configuration
    #[arg(long, env = "CROWDMETER_MODEL")]
    pub model: Option<String>,

    /// Override count log path from configuration
    #[arg(long, env = "CROWDMETER_LOG_PATH")]
    pub log_path: Option<PathBuf>,

    /// Override publish rate (frames per second)
    #[arg(long, env = "CROWDMETER_TARGET_FPS")]
    pub target_fps: Option<f64>,

    /// Maximum number of frames to publish (0 = unlimited)
    #[arg(long, default_value = "0", env = "CROWDMETER_MAX_FRAMES")]
    pub max_frames: u64,

    /// Pipeline run time limit in seconds (0 = no limit)
    #[arg(long, default_value = "0", env = "CROWDMETER_DURATION")]
    pub duration: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CROWDMETER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
