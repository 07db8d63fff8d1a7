use crate::core::instrument::{Instrument, normalize_symbol};
use crate::core::source::{FetchError, FetchResult};
use anyhow::{Result, bail};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Outcome of folding one round of fetch results into a [`Watchlist`].
#[derive(Debug, Default, PartialEq)]
pub struct RefreshReport {
    pub updated: Vec<String>,
    pub failed: Vec<(String, FetchError)>,
}

/// Tracked instruments keyed by normalized symbol.
#[derive(Debug, Default)]
pub struct Watchlist {
    funds: BTreeMap<String, Instrument>,
}

impl Watchlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.funds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funds.is_empty()
    }

    /// Starts tracking `symbol`. Fails if it is blank or already tracked.
    pub fn add(&mut self, symbol: &str, display_name: Option<String>) -> Result<&Instrument> {
        let instrument = Instrument::new(symbol, display_name)?;
        let key = instrument.symbol().to_string();
        if self.funds.contains_key(&key) {
            bail!("{} is already in the watchlist", key);
        }
        debug!(symbol = %key, "Added to watchlist");
        Ok(self.funds.entry(key).or_insert(instrument))
    }

    pub fn find(&self, symbol: &str) -> Option<&Instrument> {
        normalize_symbol(symbol).and_then(|key| self.funds.get(&key))
    }

    pub fn find_mut(&mut self, symbol: &str) -> Option<&mut Instrument> {
        normalize_symbol(symbol).and_then(|key| self.funds.get_mut(&key))
    }

    pub fn rename(&mut self, symbol: &str, display_name: Option<String>) -> Result<()> {
        match self.find_mut(symbol) {
            Some(instrument) => {
                instrument.rename(display_name);
                Ok(())
            }
            None => bail!("{} is not in the watchlist", symbol.trim()),
        }
    }

    pub fn remove(&mut self, symbol: &str) -> Option<Instrument> {
        normalize_symbol(symbol).and_then(|key| self.funds.remove(&key))
    }

    /// Tracked symbols in sorted order.
    pub fn symbols(&self) -> Vec<String> {
        self.funds.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.funds.values()
    }

    /// Merges successful results into their instruments and collects the
    /// failures. Results for untracked symbols are ignored.
    pub fn apply_results(&mut self, results: HashMap<String, FetchResult>) -> RefreshReport {
        let mut report = RefreshReport::default();
        for (symbol, result) in results {
            let Some(instrument) = self.find_mut(&symbol) else {
                debug!(symbol = %symbol, "Ignoring result for untracked symbol");
                continue;
            };
            let key = instrument.symbol().to_string();
            match result {
                Ok(fetched) => {
                    instrument.apply_fetch(fetched);
                    report.updated.push(key);
                }
                Err(e) => {
                    warn!(symbol = %key, error = %e, "Fetch failed");
                    report.failed.push((key, e));
                }
            }
        }
        report.updated.sort();
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));
        report
    }
}
