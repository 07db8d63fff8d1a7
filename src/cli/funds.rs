use super::performance::build_watchlist;
use crate::core::Watchlist;
use crate::core::config::{AppConfig, FundEntry};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

fn fund_entries(watchlist: &Watchlist) -> Vec<FundEntry> {
    watchlist
        .iter()
        .map(|fund| FundEntry {
            symbol: fund.symbol().to_string(),
            name: fund.display_name.clone(),
        })
        .collect()
}

/// Loads the config at `path`, applies `edit` to its watchlist and saves the
/// result. Nothing is written if `edit` fails.
fn edit_watchlist<F>(path: &Path, edit: F) -> Result<String>
where
    F: FnOnce(&mut Watchlist) -> Result<String>,
{
    let mut config = AppConfig::load_from_path(path)?;
    let mut watchlist = build_watchlist(&config.funds, &[])?;
    let message = edit(&mut watchlist)?;
    config.funds = fund_entries(&watchlist);
    config.save_to_path(path)?;
    info!("{}", message);
    Ok(message)
}

/// Adds a fund to the configured watchlist.
pub fn add(path: &Path, symbol: &str, name: Option<String>) -> Result<()> {
    let message = edit_watchlist(path, |watchlist| {
        let fund = watchlist.add(symbol, name)?;
        Ok(format!("Added {fund}"))
    })?;
    println!("{message}");
    Ok(())
}

/// Removes a fund from the configured watchlist.
pub fn delete(path: &Path, symbol: &str) -> Result<()> {
    let message = edit_watchlist(path, |watchlist| {
        let fund = watchlist
            .remove(symbol)
            .with_context(|| format!("{} is not in the watchlist", symbol.trim()))?;
        Ok(format!("Deleted {fund}"))
    })?;
    println!("{message}");
    Ok(())
}

/// Sets or clears the display name of a tracked fund.
pub fn rename(path: &Path, symbol: &str, name: Option<String>) -> Result<()> {
    let message = edit_watchlist(path, |watchlist| {
        watchlist.rename(symbol, name)?;
        let fund = watchlist
            .find(symbol)
            .with_context(|| format!("{} is not in the watchlist", symbol.trim()))?;
        Ok(format!("Renamed {fund}"))
    })?;
    println!("{message}");
    Ok(())
}
