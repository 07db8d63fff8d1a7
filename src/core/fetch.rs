//! Concurrent history retrieval with per-request timeouts and retries.

use crate::core::source::{DateRange, FetchError, FetchResult, FetchedHistory, HistoryProvider};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{debug, info, instrument, warn};

/// Exponential backoff between retries of the same symbol.
///
/// The delay before retry `n` (0-based) is `base * 2^n`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(250),
            max: Duration::from_secs(4),
        }
    }
}

impl Backoff {
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Limits applied to one `fetch_all` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchBudget {
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub max_concurrency: usize,
    pub backoff: Backoff,
    /// Overall limit for the whole call; symbols still running when it
    /// elapses are reported as timed out.
    pub deadline: Option<Duration>,
}

impl Default for FetchBudget {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            max_concurrency: 8,
            backoff: Backoff::default(),
            deadline: None,
        }
    }
}

/// Fetches many symbols in parallel through one [`HistoryProvider`].
pub struct FetchOrchestrator {
    provider: Arc<dyn HistoryProvider>,
    budget: FetchBudget,
}

impl FetchOrchestrator {
    pub fn new(provider: Arc<dyn HistoryProvider>, budget: FetchBudget) -> Self {
        Self { provider, budget }
    }

    pub fn budget(&self) -> &FetchBudget {
        &self.budget
    }

    /// Fetches every symbol and returns one terminal result per symbol.
    pub async fn fetch_all<I, S>(
        &self,
        symbols: I,
        range: DateRange,
    ) -> HashMap<String, FetchResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch_all_with_progress(symbols, range, &|_, _| ()).await
    }

    /// Like [`fetch_all`](Self::fetch_all), calling `on_result` as each
    /// symbol reaches its terminal result.
    pub async fn fetch_all_with_progress<I, S>(
        &self,
        symbols: I,
        range: DateRange,
        on_result: &(dyn Fn(&str, &FetchResult) + Send + Sync),
    ) -> HashMap<String, FetchResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let symbols: BTreeSet<String> = symbols.into_iter().map(Into::into).collect();
        let mut results: HashMap<String, FetchResult> = HashMap::with_capacity(symbols.len());
        if symbols.is_empty() {
            return results;
        }

        info!(
            count = symbols.len(),
            concurrency = self.budget.max_concurrency,
            "Fetching price histories"
        );

        let slots = Arc::new(Semaphore::new(self.budget.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut task_symbols: HashMap<task::Id, String> = HashMap::with_capacity(symbols.len());
        for symbol in &symbols {
            let slots = Arc::clone(&slots);
            let provider = Arc::clone(&self.provider);
            let budget = self.budget;
            let owned = symbol.clone();
            let handle = tasks.spawn(async move {
                let result = match slots.acquire_owned().await {
                    Ok(_permit) => {
                        fetch_with_retry(provider.as_ref(), &owned, range, &budget).await
                    }
                    Err(e) => Err(FetchError::Permanent(format!("fetch slot unavailable: {e}"))),
                };
                (owned, result)
            });
            task_symbols.insert(handle.id(), symbol.clone());
        }

        let drain = async {
            while let Some(joined) = tasks.join_next_with_id().await {
                let (symbol, result) = match joined {
                    Ok((_, outcome)) => outcome,
                    Err(e) => {
                        warn!("Fetch task ended abnormally: {e}");
                        let Some(symbol) = task_symbols.get(&e.id()).cloned() else {
                            continue;
                        };
                        let error = FetchError::Permanent(format!("fetch task failed: {e}"));
                        (symbol, Err(error))
                    }
                };
                on_result(&symbol, &result);
                results.insert(symbol, result);
            }
        };

        let deadline_hit = match self.budget.deadline {
            Some(deadline) => tokio::time::timeout(deadline, drain).await.is_err(),
            None => {
                drain.await;
                false
            }
        };
        if deadline_hit {
            warn!("Fetch deadline elapsed, aborting outstanding requests");
            tasks.abort_all();
        }

        for symbol in symbols {
            if results.contains_key(&symbol) {
                continue;
            }
            let error = match self.budget.deadline {
                Some(deadline) if deadline_hit => FetchError::Timeout(deadline),
                _ => FetchError::Permanent("fetch task did not complete".to_string()),
            };
            let result = Err(error);
            on_result(&symbol, &result);
            results.insert(symbol, result);
        }

        results
    }
}

/// Runs one symbol through the timeout and retry policy.
///
/// Each attempt either yields a complete history or an error; nothing from
/// a failed or cancelled attempt survives into the next one.
#[instrument(name = "FetchSymbol", skip_all, fields(symbol = %symbol))]
pub async fn fetch_with_retry(
    provider: &dyn HistoryProvider,
    symbol: &str,
    range: DateRange,
    budget: &FetchBudget,
) -> FetchResult {
    let mut retries = 0u32;
    loop {
        let attempt = tokio::time::timeout(
            budget.request_timeout,
            provider.fetch_history(symbol, range),
        )
        .await
        .unwrap_or(Err(FetchError::Timeout(budget.request_timeout)));

        match attempt {
            Ok(raw) => {
                let fetched = FetchedHistory::from_raw(raw, retries + 1);
                debug!(
                    samples = fetched.series.len(),
                    attempts = fetched.attempts,
                    "Fetched history"
                );
                return Ok(fetched);
            }
            Err(err) if err.is_retryable() && retries < budget.max_retries => {
                let delay = budget.backoff.delay(retries);
                retries += 1;
                warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}...",
                    retries,
                    budget.max_retries + 1,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                debug!(error = %err, "Fetch failed");
                return Err(err);
            }
        }
    }
}
