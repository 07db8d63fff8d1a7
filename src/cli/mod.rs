pub mod funds;
pub mod history;
pub mod performance;
pub mod range;
pub mod setup;
pub mod ui;

use crate::core::{DateRange, FetchOrchestrator, Instrument};
use anyhow::{Context, Result};

/// Fetches one symbol and returns it as a freshly populated instrument.
pub(crate) async fn fetch_instrument(
    orchestrator: &FetchOrchestrator,
    symbol: &str,
    range: DateRange,
) -> Result<Instrument> {
    let mut instrument = Instrument::new(symbol, None)?;
    let key = instrument.symbol().to_string();
    let fetched = orchestrator
        .fetch_all([key.clone()], range)
        .await
        .remove(&key)
        .with_context(|| format!("No fetch result for {key}"))?
        .with_context(|| format!("Failed to fetch price history for {key}"))?;
    instrument.apply_fetch(fetched);
    Ok(instrument)
}
