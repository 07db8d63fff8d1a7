use crate::core::series::{MergeSummary, TimeSeries};
use crate::core::source::FetchedHistory;
use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use std::fmt::Display;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstrumentKind {
    Stock,
    MutualFund,
    #[default]
    Unknown,
}

impl From<&str> for InstrumentKind {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "equity" | "stock" => InstrumentKind::Stock,
            "mutualfund" | "mutual fund" | "fund" => InstrumentKind::MutualFund,
            _ => InstrumentKind::Unknown,
        }
    }
}

impl Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                InstrumentKind::Stock => "Stock",
                InstrumentKind::MutualFund => "Mutual Fund",
                InstrumentKind::Unknown => "Unknown",
            }
        )
    }
}

/// Trims and uppercases a ticker. Returns `None` for blank input.
pub fn normalize_symbol(symbol: &str) -> Option<String> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// A tracked stock or mutual fund together with its price history.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    symbol: String,
    pub display_name: Option<String>,
    /// Empty until the first successful fetch reports one.
    pub currency: String,
    pub kind: InstrumentKind,
    pub last_fetched: Option<DateTime<Utc>>,
    series: TimeSeries,
}

impl Instrument {
    pub fn new(symbol: &str, display_name: Option<String>) -> Result<Self> {
        let Some(symbol) = normalize_symbol(symbol) else {
            bail!("Instrument symbol must not be empty");
        };
        Ok(Self {
            symbol,
            display_name: display_name.filter(|n| !n.trim().is_empty()),
            currency: String::new(),
            kind: InstrumentKind::Unknown,
            last_fetched: None,
            series: TimeSeries::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// The user's name for the instrument, falling back to its symbol.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.symbol)
    }

    pub fn rename(&mut self, display_name: Option<String>) {
        self.display_name = display_name.filter(|n| !n.trim().is_empty());
    }

    /// Folds a successful fetch into this instrument.
    ///
    /// Samples are merged with replace-on-conflict. Metadata reported by the
    /// provider overwrites what was known before; a user-chosen display name
    /// is kept.
    pub fn apply_fetch(&mut self, fetched: FetchedHistory) -> MergeSummary {
        if let Some(currency) = fetched.currency {
            self.currency = currency;
        }
        if fetched.kind != InstrumentKind::Unknown {
            self.kind = fetched.kind;
        }
        if self.display_name.is_none() {
            self.display_name = fetched.display_name;
        }
        self.last_fetched = Some(fetched.fetched_at);
        let summary = self.series.insert_or_replace(fetched.series.iter().copied());
        debug!(
            symbol = %self.symbol,
            inserted = summary.inserted,
            replaced = summary.replaced,
            "Merged fetched history"
        );
        summary
    }
}

impl Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{} - {}", self.symbol, name),
            None => write!(f, "{}", self.symbol),
        }
    }
}
