use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use fundtrack::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fundtrack::AppCommand {
    fn from(cmd: Commands) -> fundtrack::AppCommand {
        match cmd {
            Commands::Performance { symbols, as_of } => {
                fundtrack::AppCommand::Performance { symbols, as_of }
            }
            Commands::Range { symbol, start, end } => {
                fundtrack::AppCommand::Range { symbol, start, end }
            }
            Commands::History { symbol, start, end } => {
                fundtrack::AppCommand::History { symbol, start, end }
            }
            Commands::Add { symbol, name } => fundtrack::AppCommand::Add { symbol, name },
            Commands::Delete { symbol } => fundtrack::AppCommand::Delete { symbol },
            Commands::Rename { symbol, name } => fundtrack::AppCommand::Rename { symbol, name },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show 24h, 1W, 1M and 1Y changes for the watchlist
    Performance {
        /// Extra symbols to include alongside the configured funds
        symbols: Vec<String>,
        /// Measure up to this date (YYYY-MM-DD) instead of the latest close
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Show the change of one fund between two dates
    Range {
        symbol: String,
        /// Start date (YYYY-MM-DD)
        start: NaiveDate,
        /// End date (YYYY-MM-DD)
        end: NaiveDate,
    },
    /// Add a fund to the watchlist in the config file
    Add {
        symbol: String,
        /// Optional display name
        name: Option<String>,
    },
    /// Remove a fund from the watchlist in the config file
    Delete { symbol: String },
    /// Set the display name of a tracked fund, or clear it when omitted
    Rename { symbol: String, name: Option<String> },
    /// List daily closes for one fund
    History {
        symbol: String,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => fundtrack::cli::setup::setup_at_path(path),
            None => fundtrack::cli::setup::setup(),
        },
        Some(cmd) => fundtrack::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
