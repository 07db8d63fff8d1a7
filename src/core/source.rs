//! Provider-agnostic history retrieval contract.

use crate::core::instrument::InstrumentKind;
use crate::core::series::{PricePoint, SeriesError, TimeSeries};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single history fetch.
///
/// Providers map their own failure modes onto these four kinds so the retry
/// policy stays independent of the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("symbol not found: {0}")]
    NotFound(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::Transient(_))
    }

    /// Short label for display next to a failed symbol.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "Timeout",
            FetchError::NotFound(_) => "NotFound",
            FetchError::Transient(_) => "Transient",
            FetchError::Permanent(_) => "Permanent",
        }
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SeriesError> {
        if start > end {
            return Err(SeriesError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to and including `end`.
    pub fn trailing_days(end: NaiveDate, days: u32) -> Self {
        let start = end
            .checked_sub_days(chrono::Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// History exactly as a provider returned it: samples may be unordered or
/// repeat a date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHistory {
    pub samples: Vec<PricePoint>,
    pub currency: Option<String>,
    pub kind: InstrumentKind,
    pub display_name: Option<String>,
}

/// A completed fetch, normalized into a [`TimeSeries`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedHistory {
    pub series: TimeSeries,
    pub currency: Option<String>,
    pub kind: InstrumentKind,
    pub display_name: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub attempts: u32,
}

impl FetchedHistory {
    pub fn from_raw(raw: RawHistory, attempts: u32) -> Self {
        Self {
            series: TimeSeries::from_samples(raw.samples),
            currency: raw.currency,
            kind: raw.kind,
            display_name: raw.display_name,
            fetched_at: Utc::now(),
            attempts,
        }
    }
}

pub type FetchResult = Result<FetchedHistory, FetchError>;

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Fetches daily closing prices for `symbol` within `range`.
    async fn fetch_history(&self, symbol: &str, range: DateRange)
    -> Result<RawHistory, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(FetchError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(FetchError::Transient("rate limited".into()).is_retryable());
        assert!(!FetchError::NotFound("XYZ".into()).is_retryable());
        assert!(!FetchError::Permanent("bad json".into()).is_retryable());
    }

    #[test]
    fn test_date_range_validation() {
        assert!(DateRange::new(date("2022-01-01"), date("2022-01-01")).is_ok());
        assert_eq!(
            DateRange::new(date("2022-02-01"), date("2022-01-01")),
            Err(SeriesError::InvalidRange {
                start: date("2022-02-01"),
                end: date("2022-01-01"),
            })
        );
        let range = DateRange::trailing_days(date("2022-01-31"), 30);
        assert_eq!(range.start(), date("2022-01-01"));
        assert_eq!(range.end(), date("2022-01-31"));
    }

    #[test]
    fn test_fetched_history_normalizes_raw_samples() {
        let raw = RawHistory {
            samples: vec![
                PricePoint::new(date("2022-01-02"), Decimal::from(2)),
                PricePoint::new(date("2022-01-01"), Decimal::from(1)),
            ],
            currency: Some("USD".into()),
            ..Default::default()
        };
        let fetched = FetchedHistory::from_raw(raw, 2);
        assert_eq!(fetched.series.first().unwrap().date, date("2022-01-01"));
        assert_eq!(fetched.attempts, 2);
    }
}
