pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::fetch::FetchOrchestrator;
use crate::providers::YahooHistoryProvider;
use anyhow::Result;
use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Commands that need a loaded configuration and a price provider.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Performance {
        symbols: Vec<String>,
        as_of: Option<NaiveDate>,
    },
    Range {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },
    History {
        symbol: String,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
    Add {
        symbol: String,
        name: Option<String>,
    },
    Delete {
        symbol: String,
    },
    Rename {
        symbol: String,
        name: Option<String>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Fund tracker starting...");
    let path = AppConfig::resolve_path(config_path)?;

    match command {
        AppCommand::Performance { symbols, as_of } => {
            let (config, orchestrator) = connect(&path)?;
            cli::performance::run(
                &config.funds,
                &symbols,
                &orchestrator,
                config.lookback_days,
                as_of,
            )
            .await
        }
        AppCommand::Range { symbol, start, end } => {
            let (_, orchestrator) = connect(&path)?;
            cli::range::run(&orchestrator, &symbol, start, end).await
        }
        AppCommand::History { symbol, start, end } => {
            let (config, orchestrator) = connect(&path)?;
            cli::history::run(&orchestrator, &symbol, start, end, config.lookback_days).await
        }
        AppCommand::Add { symbol, name } => cli::funds::add(&path, &symbol, name),
        AppCommand::Delete { symbol } => cli::funds::delete(&path, &symbol),
        AppCommand::Rename { symbol, name } => cli::funds::rename(&path, &symbol, name),
    }
}

/// Loads the config and wires the price provider for commands that fetch.
fn connect(path: &Path) -> Result<(AppConfig, FetchOrchestrator)> {
    let config = AppConfig::load_from_path(path)?;
    debug!("Loaded config: {config:#?}");

    let provider = YahooHistoryProvider::new(config.providers.yahoo_base_url())?;
    let orchestrator = FetchOrchestrator::new(Arc::new(provider), config.fetch_budget());
    Ok((config, orchestrator))
}
