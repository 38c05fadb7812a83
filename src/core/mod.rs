//! Core business logic abstractions

pub mod config;
pub mod currency;
pub mod format;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use format::format_rate;
pub use rates::{
    FetchStatus, HistoricalPoint, HistoricalSeries, LatestRates, RateSnapshot, RatesApi,
    Selection,
};
