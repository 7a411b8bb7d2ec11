/// Snapfeed CLI - visual tweet capture and classification pipeline.
///
/// Entry point for the snapfeed binary. Parses CLI arguments,
/// initializes logging, and dispatches to subcommand handlers.
mod commands;

use clap::Parser;
use snapfeed_core::config::Config;
use tracing_subscriber::EnvFilter;

/// Visual tweet capture and classification pipeline
#[derive(Parser)]
#[command(name = "snapfeed")]
#[command(version)]
#[command(about = "Capture, extract, and classify recent posts from X accounts")]
#[command(after_help = "\
Examples:
  snapfeed run --accounts karpathy AndrewYNg --days 7 --max 20
  snapfeed capture --account karpathy --output run_artifacts
  snapfeed worker --aws")]
struct Cli {
    /// Path to config.toml (defaults are used when absent)
    #[arg(short = 'c', long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the full pipeline: capture, extract, classify, persist
    Run(commands::RunArgs),
    /// Capture one account (or one post) without classification
    Capture(commands::CaptureArgs),
    /// Run the long-lived classification worker
    Worker(commands::WorkerArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose/--quiet flags > default.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("snapfeed=debug,snapfeed_core=debug,info")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::new("snapfeed=info,snapfeed_core=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.verbose)
        .compact()
        .init();

    let config = Config::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, config).await,
        Commands::Capture(args) => commands::capture::execute(args, config).await,
        Commands::Worker(args) => commands::worker::execute(args, config).await,
    }
}
