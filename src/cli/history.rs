use super::{fetch_instrument, ui};
use crate::core::performance::percent_change;
use crate::core::{DateRange, FetchOrchestrator, PricePoint};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use comfy_table::Cell;

/// Resolves the listing window: `end` defaults to today and `start` to
/// `lookback_days` before `end`.
pub fn listing_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    lookback_days: u32,
) -> Result<DateRange> {
    let end = end.unwrap_or_else(|| Utc::now().date_naive());
    Ok(match start {
        Some(start) => DateRange::new(start, end)?,
        None => DateRange::trailing_days(end, lookback_days),
    })
}

pub async fn run(
    orchestrator: &FetchOrchestrator,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    lookback_days: u32,
) -> Result<()> {
    let range = listing_range(start, end, lookback_days)?;
    let fund = fetch_instrument(orchestrator, symbol, range).await?;
    let points = fund.series().price_in_range(range.start(), range.end())?;

    println!(
        "\n{}",
        ui::style_text(
            &format!("{fund}: {} to {}", range.start(), range.end()),
            ui::StyleType::Title
        )
    );
    if points.is_empty() {
        println!("No prices between {} and {}.", range.start(), range.end());
        return Ok(());
    }
    display_points(points, &fund.currency);
    Ok(())
}

fn display_points(points: &[PricePoint], currency: &str) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell(&format!("Close ({currency})")),
        ui::header_cell("Change"),
    ]);

    let mut previous: Option<&PricePoint> = None;
    for point in points {
        let change = match previous.map(|p| percent_change(p.price, point.price)) {
            Some(Ok(pct)) => ui::change_cell(pct),
            Some(Err(_)) => ui::na_cell(true),
            None => ui::na_cell(false),
        };
        table.add_row(vec![Cell::new(point.date), ui::price_cell(point.price), change]);
        previous = Some(point);
    }
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_listing_range_defaults() {
        let range = listing_range(None, Some(date("2022-03-31")), 30).unwrap();
        assert_eq!(range.start(), date("2022-03-01"));
        assert_eq!(range.end(), date("2022-03-31"));

        let range =
            listing_range(Some(date("2022-03-10")), Some(date("2022-03-31")), 30).unwrap();
        assert_eq!(range.start(), date("2022-03-10"));
    }

    #[test]
    fn test_listing_range_rejects_inverted_dates() {
        let err =
            listing_range(Some(date("2022-04-01")), Some(date("2022-03-31")), 30).unwrap_err();
        assert!(err.to_string().contains("2022-04-01"));
    }
}
