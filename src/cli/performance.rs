use super::ui;
use crate::core::config::FundEntry;
use crate::core::performance::{Performance, PerformanceError, Period, period_performance};
use crate::core::{
    DateRange, FetchError, FetchOrchestrator, InstrumentKind, PricePoint, RefreshReport, Watchlist,
};
use anyhow::Result;
use chrono::{NaiveDate, Utc};
use comfy_table::Cell;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// One line of the performance table.
#[derive(Debug)]
pub struct PerformanceRow {
    pub symbol: String,
    pub label: String,
    pub kind: InstrumentKind,
    pub currency: String,
    pub latest: Option<PricePoint>,
    pub changes: BTreeMap<Period, Result<Performance, PerformanceError>>,
    pub error: Option<FetchError>,
}

/// Watchlist from the configured funds plus any symbols given on the
/// command line. Symbols already tracked are not added twice.
pub fn build_watchlist(funds: &[FundEntry], extra: &[String]) -> Result<Watchlist> {
    let mut watchlist = Watchlist::new();
    for fund in funds {
        watchlist.add(&fund.symbol, fund.name.clone())?;
    }
    for symbol in extra {
        if watchlist.find(symbol).is_none() {
            watchlist.add(symbol, None)?;
        }
    }
    Ok(watchlist)
}

/// Fetches every tracked symbol over `range` and folds the results in.
pub async fn refresh(
    watchlist: &mut Watchlist,
    orchestrator: &FetchOrchestrator,
    range: DateRange,
) -> RefreshReport {
    let symbols = watchlist.symbols();
    let pb = ui::new_progress_bar(symbols.len() as u64, true);
    pb.set_message("Fetching prices");
    let results: HashMap<_, _> = orchestrator
        .fetch_all_with_progress(symbols, range, &|symbol, _| {
            pb.set_message(symbol.to_string());
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();
    watchlist.apply_results(results)
}

/// Computes every period's change for each tracked fund.
///
/// Without `as_of`, each fund is measured from its own latest sample.
pub fn summarize(
    watchlist: &Watchlist,
    report: &RefreshReport,
    as_of: Option<NaiveDate>,
) -> Vec<PerformanceRow> {
    let failures: HashMap<&str, &FetchError> = report
        .failed
        .iter()
        .map(|(symbol, e)| (symbol.as_str(), e))
        .collect();

    watchlist
        .iter()
        .map(|fund| {
            let series = fund.series();
            let latest = match as_of {
                Some(date) => series.price_as_of(date).ok(),
                None => series.latest().ok(),
            };
            let changes = match latest {
                Some(point) => Period::ALL
                    .iter()
                    .map(|period| {
                        let date = as_of.unwrap_or(point.date);
                        (*period, period_performance(series, date, *period))
                    })
                    .collect(),
                None => BTreeMap::new(),
            };
            PerformanceRow {
                symbol: fund.symbol().to_string(),
                label: fund.label().to_string(),
                kind: fund.kind,
                currency: fund.currency.clone(),
                latest,
                changes,
                error: failures.get(fund.symbol()).map(|e| (*e).clone()),
            }
        })
        .collect()
}

pub async fn run(
    funds: &[FundEntry],
    extra_symbols: &[String],
    orchestrator: &FetchOrchestrator,
    lookback_days: u32,
    as_of: Option<NaiveDate>,
) -> Result<()> {
    let mut watchlist = build_watchlist(funds, extra_symbols)?;
    if watchlist.is_empty() {
        println!("No funds to track. Add some to the config file or pass symbols.");
        return Ok(());
    }

    let end = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let range = DateRange::trailing_days(end, lookback_days);
    info!(funds = watchlist.len(), "Refreshing watchlist");
    let report = refresh(&mut watchlist, orchestrator, range).await;
    debug!(
        updated = report.updated.len(),
        failed = report.failed.len(),
        "Refresh complete"
    );

    let rows = summarize(&watchlist, &report, as_of);
    display_results(&rows, as_of);
    Ok(())
}

fn display_results(rows: &[PerformanceRow], as_of: Option<NaiveDate>) {
    let title = match as_of {
        Some(date) => format!("Performance as of {date}"),
        None => "Performance".to_string(),
    };
    println!("\n{}", ui::style_text(&title, ui::StyleType::Title));

    let mut table = ui::new_styled_table();
    let mut header = vec![
        ui::header_cell("Fund"),
        ui::header_cell("Kind"),
        ui::header_cell("Currency"),
        ui::header_cell("Price"),
        ui::header_cell("Date"),
    ];
    header.extend(Period::ALL.iter().map(|p| ui::header_cell(&p.to_string())));
    table.set_header(header);

    let mut errors = Vec::new();
    for row in rows {
        let fund = if row.label == row.symbol {
            row.symbol.clone()
        } else {
            format!("{}\n{}", row.symbol, ui::style_text(&row.label, ui::StyleType::Subtle))
        };
        let mut cells = vec![Cell::new(fund), Cell::new(row.kind), Cell::new(&row.currency)];

        match &row.latest {
            Some(point) => {
                cells.push(ui::price_cell(point.price));
                cells.push(Cell::new(point.date));
            }
            None => {
                cells.push(ui::na_cell(row.error.is_some()));
                cells.push(ui::na_cell(row.error.is_some()));
            }
        }

        for period in Period::ALL {
            cells.push(match row.changes.get(&period) {
                Some(Ok(perf)) => ui::change_cell(perf.change_pct),
                _ => ui::na_cell(row.error.is_some()),
            });
        }
        table.add_row(cells);

        if let Some(e) = &row.error {
            errors.push(format!("{} ({}): {}", row.symbol, e.kind(), e));
        }
    }

    println!("{table}");
    for line in errors {
        println!("{}", ui::style_text(&line, ui::StyleType::Error));
    }
}
