//! Core business logic abstractions

pub mod config;
pub mod fetch;
pub mod instrument;
pub mod log;
pub mod performance;
pub mod series;
pub mod source;
pub mod watchlist;

// Re-export main types for cleaner imports
pub use fetch::{Backoff, FetchBudget, FetchOrchestrator};
pub use instrument::{Instrument, InstrumentKind};
pub use performance::{Performance, PerformanceError, Period};
pub use series::{PricePoint, SeriesError, TimeSeries};
pub use source::{DateRange, FetchError, FetchResult, FetchedHistory, HistoryProvider};
pub use watchlist::{RefreshReport, Watchlist};
