//! Request lifecycle controllers sitting between the API and the presentation layer

pub mod historical;
pub mod rate_feed;

#[cfg(test)]
pub(crate) mod testing;

pub use historical::{
    HISTORY_FAILURE_MESSAGE, HistoricalSeriesFetcher, HistorySettings, HistoryStatus,
};
pub use rate_feed::{FeedSettings, RATES_FAILURE_MESSAGE, RateFeedController, RateStatus};
