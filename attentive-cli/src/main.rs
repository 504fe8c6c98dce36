//! Attentive CLI: train, evaluate and query RBM screening models.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Attentive: RBM feature learning for assessment screening
#[derive(Parser, Debug)]
#[command(name = "attentive", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Split, search hidden sizes, fit, evaluate and save artifacts
    Train {
        /// CSV file with a header row and a binary label column
        #[arg(short, long)]
        data: PathBuf,
        /// Extra configuration file layered over the workspace config
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Artifact directory (defaults to output.artifact_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Also write the full report, ROC points included, as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Predict one record from saved artifacts
    Predict {
        /// Artifact directory (defaults to output.artifact_dir)
        #[arg(short, long)]
        artifacts: Option<PathBuf>,
        /// JSON object mapping feature names to raw values
        #[arg(short, long)]
        input: String,
        /// Seed for the hidden-unit sampling
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Print the prediction as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)));

    let log_dir = directories::ProjectDirs::from("dev", "attentive", "attentive")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "attentive.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli.command, &workspace)
}
