use crate::core::instrument::InstrumentKind;
use crate::core::series::PricePoint;
use crate::core::source::{DateRange, FetchError, HistoryProvider, RawHistory};
use crate::providers::util::{classify_request_error, classify_status, http_client};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Decimal places kept from the float closes Yahoo reports.
const PRICE_SCALE: u32 = 4;

/// Daily close history from the Yahoo Finance v8 chart API.
pub struct YahooHistoryProvider {
    base_url: String,
    client: reqwest::Client,
}

impl YahooHistoryProvider {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Ok(YahooHistoryProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client()?,
        })
    }

    fn chart_url(&self, symbol: &str, range: DateRange) -> String {
        let period1 = start_of_day(range.start());
        // period2 is exclusive, so ask for the midnight after the last day.
        let period2 = range
            .end()
            .checked_add_days(Days::new(1))
            .map_or(i64::MAX, start_of_day);
        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url, symbol, period1, period2
        )
    }
}

fn start_of_day(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map_or(0, |dt| dt.and_utc().timestamp())
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartEnvelope,
}

#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    currency: Option<String>,
    #[serde(alias = "instrumentType")]
    instrument_type: Option<String>,
    #[serde(alias = "longName")]
    long_name: Option<String>,
    #[serde(alias = "shortName")]
    short_name: Option<String>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

fn parse_chart(body: &str, symbol: &str, range: DateRange) -> Result<RawHistory, FetchError> {
    let data: YahooChartResponse = serde_json::from_str(body).map_err(|e| {
        FetchError::Permanent(format!("Failed to parse JSON response for {symbol}: {e}"))
    })?;

    if let Some(error) = data.chart.error {
        return Err(if error.code.eq_ignore_ascii_case("Not Found") {
            FetchError::NotFound(symbol.to_string())
        } else {
            FetchError::Permanent(format!(
                "Chart error for {}: {} {}",
                symbol,
                error.code,
                error.description.unwrap_or_default()
            ))
        });
    }

    let item = data
        .chart
        .result
        .and_then(|items| items.into_iter().next())
        .ok_or_else(|| FetchError::NotFound(symbol.to_string()))?;

    let timestamps = item.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        debug!("No price history in requested range for {}", symbol);
        return Err(FetchError::NotFound(symbol.to_string()));
    }
    let closes = item
        .indicators
        .and_then(|inds| inds.quote.into_iter().next())
        .and_then(|q| q.close)
        .ok_or_else(|| FetchError::Permanent(format!("Missing close prices for {symbol}")))?;
    if closes.len() != timestamps.len() {
        return Err(FetchError::Permanent(format!(
            "Mismatched history for {}: {} timestamps, {} closes",
            symbol,
            timestamps.len(),
            closes.len()
        )));
    }

    let offset = item.meta.gmtoffset;
    let mut samples = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.iter().zip(closes) {
        // Days without a settled close come back as null.
        let Some(price) = close.and_then(Decimal::from_f64) else {
            continue;
        };
        let date = ts
            .checked_add(offset)
            .and_then(|local| DateTime::from_timestamp(local, 0))
            .ok_or_else(|| {
                FetchError::Permanent(format!(
                    "Invalid timestamp {ts} with offset {offset} for {symbol}"
                ))
            })?
            .date_naive();
        if date >= range.start() && date <= range.end() {
            samples.push(PricePoint::new(date, price.round_dp(PRICE_SCALE)));
        }
    }
    if samples.is_empty() {
        debug!("No settled closes in requested range for {}", symbol);
        return Err(FetchError::NotFound(symbol.to_string()));
    }

    Ok(RawHistory {
        samples,
        currency: item.meta.currency,
        kind: item
            .meta
            .instrument_type
            .as_deref()
            .map_or(InstrumentKind::Unknown, InstrumentKind::from),
        display_name: item.meta.long_name.or(item.meta.short_name),
    })
}

#[async_trait]
impl HistoryProvider for YahooHistoryProvider {
    #[instrument(
        name = "YahooHistoryFetch",
        skip(self, range),
        fields(symbol = %symbol)
    )]
    async fn fetch_history(
        &self,
        symbol: &str,
        range: DateRange,
    ) -> Result<RawHistory, FetchError> {
        let url = self.chart_url(symbol, range);
        debug!("Requesting price history from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_request_error(&e, symbol))?;

        debug!(status = %response.status(), "Received Yahoo response");
        if let Some(error) = classify_status(response.status(), symbol) {
            return Err(error);
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_request_error(&e, symbol))?;

        let history = parse_chart(&body, symbol, range)?;
        debug!(samples = history.samples.len(), "Parsed Yahoo history");
        Ok(history)
    }
}
