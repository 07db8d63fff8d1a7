//! Percentage-change calculations over a [`TimeSeries`].
//!
//! Every function here is pure: it only reads the series it is given and
//! reports the price points it actually resolved, so callers can show which
//! dates were used when a requested day had no sample.

use crate::core::series::{PricePoint, SeriesError, TimeSeries};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PerformanceError {
    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("percentage change is undefined for a starting price of zero")]
    DivisionUndefined,

    #[error("percentage change overflowed")]
    Overflow,
}

/// Fixed look-back windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Day, Period::Week, Period::Month, Period::Year];

    pub fn offset(&self) -> Duration {
        match self {
            Period::Day => Duration::days(1),
            Period::Week => Duration::days(7),
            Period::Month => Duration::days(30),
            Period::Year => Duration::days(365),
        }
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Period::Day => "24h",
                Period::Week => "1W",
                Period::Month => "1M",
                Period::Year => "1Y",
            }
        )
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "24H" | "1D" => Ok(Period::Day),
            "1W" => Ok(Period::Week),
            "1M" => Ok(Period::Month),
            "1Y" => Ok(Period::Year),
            _ => Err(anyhow::anyhow!("Invalid performance period: {}", s)),
        }
    }
}

/// Change between two resolved price points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Performance {
    pub change_pct: f64,
    pub start: PricePoint,
    pub end: PricePoint,
}

/// `(later - earlier) / earlier * 100`, computed in decimal arithmetic.
pub fn percent_change(earlier: Decimal, later: Decimal) -> Result<f64, PerformanceError> {
    if earlier.is_zero() {
        return Err(PerformanceError::DivisionUndefined);
    }
    later
        .checked_sub(earlier)
        .and_then(|delta| delta.checked_div(earlier))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|pct| pct.to_f64())
        .ok_or(PerformanceError::Overflow)
}

/// Change from the price as of `as_of - offset` to the price as of `as_of`.
pub fn offset_performance(
    series: &TimeSeries,
    as_of: NaiveDate,
    offset: Duration,
) -> Result<Performance, PerformanceError> {
    let end = series.price_as_of(as_of)?;
    let earlier = as_of
        .checked_sub_signed(offset)
        .ok_or(SeriesError::NoData)?;
    let start = series.price_as_of(earlier)?;
    between(start, end)
}

pub fn period_performance(
    series: &TimeSeries,
    as_of: NaiveDate,
    period: Period,
) -> Result<Performance, PerformanceError> {
    offset_performance(series, as_of, period.offset())
}

pub fn day_performance(
    series: &TimeSeries,
    as_of: NaiveDate,
) -> Result<Performance, PerformanceError> {
    period_performance(series, as_of, Period::Day)
}

pub fn week_performance(
    series: &TimeSeries,
    as_of: NaiveDate,
) -> Result<Performance, PerformanceError> {
    period_performance(series, as_of, Period::Week)
}

pub fn month_performance(
    series: &TimeSeries,
    as_of: NaiveDate,
) -> Result<Performance, PerformanceError> {
    period_performance(series, as_of, Period::Month)
}

pub fn year_performance(
    series: &TimeSeries,
    as_of: NaiveDate,
) -> Result<Performance, PerformanceError> {
    period_performance(series, as_of, Period::Year)
}

/// Change between the prices as of `start` and as of `end`.
pub fn range_performance(
    series: &TimeSeries,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Performance, PerformanceError> {
    if start > end {
        return Err(SeriesError::InvalidRange { start, end }.into());
    }
    let start_point = series.price_as_of(start)?;
    let end_point = series.price_as_of(end)?;
    between(start_point, end_point)
}

fn between(start: PricePoint, end: PricePoint) -> Result<Performance, PerformanceError> {
    Ok(Performance {
        change_pct: percent_change(start.price, end.price)?,
        start,
        end,
    })
}
