//! Date-indexed price history for a single instrument.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use thiserror::Error;

/// A single closing price observed on a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: Decimal,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: Decimal) -> Self {
        Self { date, price }
    }
}

/// Errors raised by series lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("no price data available")]
    NoData,

    #[error("invalid date range: {start} is after {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Outcome of merging a batch of samples into a series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub replaced: usize,
}

/// Ordered, duplicate-free sequence of price points.
///
/// Points are kept in one contiguous vector sorted ascending by date, so
/// every lookup is a binary search. The ordering is restored by every
/// mutating method; there is no way to push an out-of-order point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeries {
    points: Vec<PricePoint>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a series from samples in any order. Later duplicates win.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = PricePoint>,
    {
        Self {
            points: normalize(samples.into_iter().collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PricePoint> {
        self.points.iter()
    }

    pub fn first(&self) -> Result<PricePoint, SeriesError> {
        self.points.first().copied().ok_or(SeriesError::NoData)
    }

    pub fn latest(&self) -> Result<PricePoint, SeriesError> {
        self.points.last().copied().ok_or(SeriesError::NoData)
    }

    /// Merges `samples` into the series.
    ///
    /// A sample whose date is already present replaces the stored price:
    /// incoming data is treated as an upstream revision. Applying the same
    /// batch twice leaves the series unchanged the second time.
    pub fn insert_or_replace<I>(&mut self, samples: I) -> MergeSummary
    where
        I: IntoIterator<Item = PricePoint>,
    {
        let incoming = normalize(samples.into_iter().collect());
        if incoming.is_empty() {
            return MergeSummary::default();
        }

        let existing = std::mem::take(&mut self.points);
        let mut merged = Vec::with_capacity(existing.len() + incoming.len());
        let mut summary = MergeSummary::default();
        let mut old = existing.into_iter().peekable();
        let mut new = incoming.into_iter().peekable();

        loop {
            let next_old = old.peek().map(|p| p.date);
            let next_new = new.peek().map(|p| p.date);
            match (next_old, next_new) {
                (Some(a), Some(b)) => match a.cmp(&b) {
                    Ordering::Less => merged.extend(old.next()),
                    Ordering::Greater => {
                        summary.inserted += 1;
                        merged.extend(new.next());
                    }
                    Ordering::Equal => {
                        old.next();
                        summary.replaced += 1;
                        merged.extend(new.next());
                    }
                },
                (Some(_), None) => {
                    merged.extend(old.by_ref());
                    break;
                }
                (None, Some(_)) => {
                    let rest: Vec<_> = new.by_ref().collect();
                    summary.inserted += rest.len();
                    merged.extend(rest);
                    break;
                }
                (None, None) => break,
            }
        }

        self.points = merged;
        summary
    }

    /// Returns the latest point dated on or before `date`.
    ///
    /// The returned point carries the date actually used, which is earlier
    /// than `date` whenever there was no sample on that exact day.
    pub fn price_as_of(&self, date: NaiveDate) -> Result<PricePoint, SeriesError> {
        let idx = self.points.partition_point(|p| p.date <= date);
        if idx == 0 {
            return Err(SeriesError::NoData);
        }
        Ok(self.points[idx - 1])
    }

    /// Returns every point dated within `[start, end]`.
    pub fn price_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<&[PricePoint], SeriesError> {
        if start > end {
            return Err(SeriesError::InvalidRange { start, end });
        }
        if self.points.is_empty() {
            return Err(SeriesError::NoData);
        }
        let lo = self.points.partition_point(|p| p.date < start);
        let hi = self.points.partition_point(|p| p.date <= end);
        Ok(&self.points[lo..hi])
    }
}

// Stable sort then collapse equal dates, keeping the last occurrence.
fn normalize(mut samples: Vec<PricePoint>) -> Vec<PricePoint> {
    samples.sort_by_key(|p| p.date);
    let mut out: Vec<PricePoint> = Vec::with_capacity(samples.len());
    for point in samples {
        match out.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => out.push(point),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn point(d: &str, price: i64) -> PricePoint {
        PricePoint::new(date(d), Decimal::from(price))
    }

    fn sample_series() -> TimeSeries {
        TimeSeries::from_samples(vec![
            point("2022-01-10", 120),
            point("2022-01-01", 100),
            point("2022-01-05", 110),
        ])
    }

    #[test]
    fn test_from_samples_sorts_and_dedups() {
        let series = TimeSeries::from_samples(vec![
            point("2022-01-03", 3),
            point("2022-01-01", 1),
            point("2022-01-03", 4),
            point("2022-01-02", 2),
        ]);
        let dates: Vec<_> = series.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date("2022-01-01"), date("2022-01-02"), date("2022-01-03")]);
        assert_eq!(series.latest().unwrap().price, Decimal::from(4));
    }

    #[test]
    fn test_price_as_of_between_samples_uses_earlier_date() {
        let series =
            TimeSeries::from_samples(vec![point("2022-01-01", 100), point("2022-01-10", 120)]);
        let found = series.price_as_of(date("2022-01-05")).unwrap();
        assert_eq!(found, point("2022-01-01", 100));
    }

    #[test]
    fn test_price_as_of_exact_and_after_last() {
        let series = sample_series();
        assert_eq!(series.price_as_of(date("2022-01-05")).unwrap(), point("2022-01-05", 110));
        assert_eq!(series.price_as_of(date("2022-01-10")).unwrap(), point("2022-01-10", 120));
        assert_eq!(series.price_as_of(date("2023-06-01")).unwrap(), point("2022-01-10", 120));
    }

    #[test]
    fn test_price_as_of_before_first_sample_is_no_data() {
        let series = sample_series();
        assert_eq!(series.price_as_of(date("2021-12-31")), Err(SeriesError::NoData));
    }

    #[test]
    fn test_empty_series_queries_fail() {
        let series = TimeSeries::new();
        assert!(series.is_empty());
        assert_eq!(series.price_as_of(date("2022-01-01")), Err(SeriesError::NoData));
        assert_eq!(series.latest(), Err(SeriesError::NoData));
        assert_eq!(series.first(), Err(SeriesError::NoData));
        assert_eq!(
            series.price_in_range(date("2022-01-01"), date("2022-02-01")),
            Err(SeriesError::NoData)
        );
    }

    #[test]
    fn test_price_as_of_matches_linear_scan() {
        // Samples on odd days of January, queried on every day.
        let series = TimeSeries::from_samples((1..=31).step_by(2).map(|d| {
            PricePoint::new(
                NaiveDate::from_ymd_opt(2022, 1, d).unwrap(),
                Decimal::from(d),
            )
        }));
        for day in 1..=31 {
            let query = NaiveDate::from_ymd_opt(2022, 1, day).unwrap();
            let expected = series.iter().rev().find(|p| p.date <= query).copied();
            assert_eq!(series.price_as_of(query).ok(), expected, "as of {query}");
        }
    }

    #[test]
    fn test_price_in_range_is_inclusive() {
        let series = sample_series();
        let slice = series.price_in_range(date("2022-01-01"), date("2022-01-05")).unwrap();
        assert_eq!(slice, &[point("2022-01-01", 100), point("2022-01-05", 110)]);

        let slice = series.price_in_range(date("2022-01-02"), date("2022-01-04")).unwrap();
        assert!(slice.is_empty());
    }

    #[test]
    fn test_price_in_range_rejects_inverted_range() {
        let series = sample_series();
        assert_eq!(
            series.price_in_range(date("2022-01-10"), date("2022-01-01")),
            Err(SeriesError::InvalidRange {
                start: date("2022-01-10"),
                end: date("2022-01-01"),
            })
        );
    }

    #[test]
    fn test_insert_or_replace_merges_and_replaces() {
        let mut series = sample_series();
        let summary = series.insert_or_replace(vec![
            point("2022-01-12", 125),
            point("2022-01-05", 111),
            point("2021-12-30", 99),
        ]);
        assert_eq!(summary, MergeSummary { inserted: 2, replaced: 1 });

        let prices: Vec<_> = series.iter().map(|p| p.price).collect();
        assert_eq!(
            prices,
            vec![
                Decimal::from(99),
                Decimal::from(100),
                Decimal::from(111),
                Decimal::from(120),
                Decimal::from(125),
            ]
        );
        assert!(series.points().windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_insert_or_replace_is_idempotent() {
        let batch = vec![point("2022-01-07", 115), point("2022-01-05", 112)];
        let mut once = sample_series();
        once.insert_or_replace(batch.clone());

        let mut twice = sample_series();
        twice.insert_or_replace(batch.clone());
        let second = twice.insert_or_replace(batch);

        assert_eq!(once, twice);
        assert_eq!(second, MergeSummary { inserted: 0, replaced: 2 });
    }

    #[test]
    fn test_insert_into_empty_series() {
        let mut series = TimeSeries::new();
        let summary =
            series.insert_or_replace(vec![point("2022-01-02", 2), point("2022-01-01", 1)]);
        assert_eq!(summary, MergeSummary { inserted: 2, replaced: 0 });
        assert_eq!(series.first().unwrap(), point("2022-01-01", 1));
        assert_eq!(series.insert_or_replace(Vec::new()), MergeSummary::default());
    }
}
