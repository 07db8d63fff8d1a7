use super::{fetch_instrument, ui};
use crate::core::performance::{Performance, range_performance};
use crate::core::{DateRange, FetchOrchestrator, Instrument, SeriesError};
use anyhow::Result;
use chrono::{Days, NaiveDate};
use comfy_table::Cell;

/// Extra history requested before the start date so a start that falls on
/// a weekend or holiday still resolves to the prior close.
pub const START_PADDING_DAYS: u64 = 7;

/// The window fetched for a custom range query.
pub fn padded_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange, SeriesError> {
    if start > end {
        return Err(SeriesError::InvalidRange { start, end });
    }
    let padded = start
        .checked_sub_days(Days::new(START_PADDING_DAYS))
        .unwrap_or(start);
    DateRange::new(padded, end)
}

pub async fn run(
    orchestrator: &FetchOrchestrator,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    let range = padded_range(start, end)?;
    let fund = fetch_instrument(orchestrator, symbol, range).await?;
    let performance = range_performance(fund.series(), start, end)?;
    display_result(&fund, start, end, &performance);
    Ok(())
}

fn display_result(fund: &Instrument, start: NaiveDate, end: NaiveDate, perf: &Performance) {
    println!(
        "\n{}",
        ui::style_text(&format!("{fund}: {start} to {end}"), ui::StyleType::Title)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Start Date"),
        ui::header_cell("Start Price"),
        ui::header_cell("End Date"),
        ui::header_cell("End Price"),
        ui::header_cell("Change"),
    ]);
    table.add_row(vec![
        Cell::new(perf.start.date),
        ui::price_cell(perf.start.price),
        Cell::new(perf.end.date),
        ui::price_cell(perf.end.price),
        ui::change_cell(perf.change_pct),
    ]);
    println!("{table}");

    if perf.start.date != start || perf.end.date != end {
        println!(
            "{}",
            ui::style_text(
                "No trading on a requested date; the closest earlier close was used.",
                ui::StyleType::Subtle
            )
        );
    }
}
